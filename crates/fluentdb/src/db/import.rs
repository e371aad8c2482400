use super::Db;
use crate::error::{DbError, DbResult};
use crate::value::quote_literal;
use std::path::Path;
use std::panic::Location;

/// Options for `LOAD DATA INFILE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDataSettings {
    pub field_terminator: String,
    pub enclosed_by: Option<String>,
    pub line_terminator: String,
    pub line_starting: Option<String>,
    pub ignore_lines: u32,
    /// Read the file on the client (`LOCAL`).
    pub local: bool,
}

impl Default for LoadDataSettings {
    fn default() -> Self {
        Self {
            field_terminator: ";".into(),
            enclosed_by: None,
            line_terminator: "\n".into(),
            line_starting: None,
            ignore_lines: 1,
            local: false,
        }
    }
}

/// Options for `LOAD XML INFILE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadXmlSettings {
    /// Element name of one row, without angle brackets.
    pub row_tag: Option<String>,
    pub ignore_lines: u32,
    pub local: bool,
}

fn existing_file(path: &Path) -> DbResult<String> {
    if !path.is_file() {
        return Err(DbError::NotFound(format!("import file {}", path.display())));
    }
    Ok(quote_literal(&path.to_string_lossy()))
}

impl Db {
    /// Bulk-load a delimited file into `table`. The path and settings are
    /// trusted and spliced into the statement as quoted literals.
    #[track_caller]
    pub fn load_data(
        &mut self,
        table: &str,
        path: impl AsRef<Path>,
        settings: &LoadDataSettings,
    ) -> DbResult<u64> {
        let caller = Location::caller();
        self.begin_terminal();
        let file = existing_file(path.as_ref());
        let file = self.check(file)?;
        let table = self.table(table)?.prefixed(&self.prefix);

        let mut sql = format!(
            "LOAD DATA{} INFILE {file} INTO TABLE {table} FIELDS TERMINATED BY {}",
            if settings.local { " LOCAL" } else { "" },
            quote_literal(&settings.field_terminator),
        );
        if let Some(enclosure) = &settings.enclosed_by {
            sql.push_str(&format!(" ENCLOSED BY {}", quote_literal(enclosure)));
        }
        sql.push_str(" LINES");
        if let Some(start) = &settings.line_starting {
            sql.push_str(&format!(" STARTING BY {}", quote_literal(start)));
        }
        sql.push_str(&format!(
            " TERMINATED BY {} IGNORE {} LINES",
            quote_literal(&settings.line_terminator),
            settings.ignore_lines
        ));

        self.execute_unprepared(&sql, caller)
    }

    /// Bulk-load an XML file into `table`.
    #[track_caller]
    pub fn load_xml(
        &mut self,
        table: &str,
        path: impl AsRef<Path>,
        settings: &LoadXmlSettings,
    ) -> DbResult<u64> {
        let caller = Location::caller();
        self.begin_terminal();
        let file = existing_file(path.as_ref());
        let file = self.check(file)?;
        let table = self.table(table)?.prefixed(&self.prefix);

        let mut sql = format!(
            "LOAD XML{} INFILE {file} INTO TABLE {table}",
            if settings.local { " LOCAL" } else { "" },
        );
        if let Some(tag) = &settings.row_tag {
            sql.push_str(&format!(" ROWS IDENTIFIED BY {}", quote_literal(&format!("<{tag}>"))));
        }
        if settings.ignore_lines > 0 {
            sql.push_str(&format!(" IGNORE {} LINES", settings.ignore_lines));
        }

        self.execute_unprepared(&sql, caller)
    }
}
