//! Interactive REPL (Read-Eval-Print Loop).

use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};

/// REPL meta-commands (prefixed with `.`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Show help
    Help,
    /// Show the SQLite syntax reference
    HelpSql,
    /// List bound tables
    Tables,
    /// Show column details, for one table or all of them
    Schema(Option<String>),
    /// Print the first rows of a table
    Preview(String, Option<usize>),
    /// Load a CSV or Excel file
    Load(String),
    /// Give a table a new SQL name
    Rename(String, String),
    /// Remove a table
    Drop(String),
    /// Show or switch the SQL engine
    Engine(Option<String>),
    /// Print example queries for the loaded tables
    Examples,
    /// Exit the REPL
    Quit,
    /// Execute SQL query
    Sql(String),
    /// Export query results to file
    /// First String is filename, second is optional SQL query
    Export(String, Option<String>),
    /// Unknown command
    Unknown(String),
    /// Empty input
    Empty,
}

impl ReplCommand {
    /// Parse a line of input into a command.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        if !trimmed.starts_with('.') {
            if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                return ReplCommand::Quit;
            }
            return ReplCommand::Sql(trimmed.to_string());
        }

        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };

        match name.to_lowercase().as_str() {
            ".help" | ".h" | ".?" if rest.eq_ignore_ascii_case("sql") => ReplCommand::HelpSql,
            ".help" | ".h" | ".?" => ReplCommand::Help,
            ".tables" | ".t" => ReplCommand::Tables,
            ".schema" | ".s" => ReplCommand::Schema(single_arg(rest)),
            ".examples" | ".ex" => ReplCommand::Examples,
            ".quit" | ".exit" | ".q" => ReplCommand::Quit,
            ".engine" => ReplCommand::Engine(non_empty(rest)),
            ".preview" | ".p" => Self::parse_preview(rest),
            ".load" => match single_arg(rest) {
                Some(path) => ReplCommand::Load(path),
                None => ReplCommand::Unknown(".load requires a file path".to_string()),
            },
            ".rename" => Self::parse_rename(rest),
            ".drop" => match single_arg(rest) {
                Some(table) => ReplCommand::Drop(table),
                None => ReplCommand::Unknown(".drop requires a table name".to_string()),
            },
            ".export" => Self::parse_export(rest),
            _ => ReplCommand::Unknown(trimmed.to_string()),
        }
    }

    /// Parse `.preview <table> [rows]`.
    fn parse_preview(rest: &str) -> Self {
        let args = match split_args(rest) {
            Ok(args) => args,
            Err(e) => return ReplCommand::Unknown(e),
        };

        match args.as_slice() {
            [table] => ReplCommand::Preview(table.clone(), None),
            [table, n] => match n.parse::<usize>() {
                Ok(n) => ReplCommand::Preview(table.clone(), Some(n)),
                Err(_) => ReplCommand::Unknown(format!("Invalid row count: {n}")),
            },
            _ => ReplCommand::Unknown(".preview requires <table> [rows]".to_string()),
        }
    }

    /// Parse `.rename <table> <new_name>`.
    fn parse_rename(rest: &str) -> Self {
        match split_args(rest) {
            Ok(args) => match args.as_slice() {
                [table, new_name] => ReplCommand::Rename(table.clone(), new_name.clone()),
                _ => ReplCommand::Unknown(".rename requires <table> <new_name>".to_string()),
            },
            Err(e) => ReplCommand::Unknown(e),
        }
    }

    /// Parse `.export <filename> [query]`.
    fn parse_export(rest: &str) -> Self {
        if rest.is_empty() {
            return ReplCommand::Unknown(".export requires a filename".to_string());
        }

        // Filename ends at first whitespace, SQL starts after
        match rest.split_once(char::is_whitespace) {
            None => ReplCommand::Export(rest.to_string(), None),
            Some((filename, query)) => {
                ReplCommand::Export(filename.to_string(), non_empty(query))
            }
        }
    }

    /// Check if this is a quit command.
    pub fn is_quit(&self) -> bool {
        matches!(self, ReplCommand::Quit)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// The whole argument string, with one pair of surrounding double quotes removed.
fn single_arg(rest: &str) -> Option<String> {
    let rest = rest.trim();
    match rest
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => non_empty(&inner.replace("\"\"", "\"")),
        None => non_empty(rest),
    }
}

/// Split arguments on whitespace. `"..."` keeps spaces and `""` inside quotes
/// is a literal quote, as in SQL identifiers.
fn split_args(rest: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut chars = rest.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut arg = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.next_if_eq(&'"').is_some() => arg.push('"'),
                    Some('"') => break,
                    Some(c) => arg.push(c),
                    None => return Err(format!("Unterminated quote in: {rest}")),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                arg.push(c);
            }
        }
        args.push(arg);
    }

    Ok(args)
}

/// Input from the REPL - either a command or a request to quit.
#[derive(Debug)]
pub enum ReplInput {
    /// User provided input
    Command(ReplCommand),
    /// User pressed Ctrl-D or Ctrl-C
    Exit,
}

/// Interactive SQL REPL using rustyline for line editing and history.
pub struct Repl {
    editor: DefaultEditor,
    history_file: Option<String>,
}

impl Repl {
    /// Create a new REPL instance.
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        Ok(Self {
            editor,
            history_file: None,
        })
    }

    /// Set the history file path.
    pub fn with_history(mut self, path: &str) -> Self {
        self.history_file = Some(path.to_string());
        if let Err(e) = self.editor.load_history(path) {
            tracing::debug!("Could not load history: {}", e);
        }
        self
    }

    /// Read a complete input from the user (handles multi-line SQL).
    pub fn read_input(&mut self) -> RlResult<ReplInput> {
        let mut buffer = String::new();
        let mut first_line = true;

        loop {
            let prompt = if first_line { "tabsql> " } else { "   ...> " };

            match self.editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if !trimmed.is_empty() {
                        let _ = self.editor.add_history_entry(&line);
                    }

                    // Dot commands are single line
                    if first_line && trimmed.starts_with('.') {
                        return Ok(ReplInput::Command(ReplCommand::parse(trimmed)));
                    }

                    if first_line
                        && (trimmed.eq_ignore_ascii_case("quit")
                            || trimmed.eq_ignore_ascii_case("exit"))
                    {
                        return Ok(ReplInput::Command(ReplCommand::Quit));
                    }

                    if first_line && trimmed.is_empty() {
                        return Ok(ReplInput::Command(ReplCommand::Empty));
                    }

                    buffer.push_str(&line);
                    buffer.push('\n');

                    // Statement is complete once it ends with a semicolon
                    if trimmed.ends_with(';') {
                        return Ok(ReplInput::Command(ReplCommand::Sql(buffer)));
                    }

                    first_line = false;
                }
                Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                    return Ok(ReplInput::Exit);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Save history to file.
    pub fn save_history(&mut self) {
        if let Some(ref path) = self.history_file {
            if let Err(e) = self.editor.save_history(path) {
                tracing::debug!("Could not save history: {}", e);
            }
        }
    }
}

impl Drop for Repl {
    fn drop(&mut self) {
        self.save_history();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse(".help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse(".H"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse(".tables"), ReplCommand::Tables);
        assert_eq!(ReplCommand::parse(".examples"), ReplCommand::Examples);
        assert_eq!(ReplCommand::parse(".quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("exit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse(""), ReplCommand::Empty);
        assert!(ReplCommand::parse(".q").is_quit());
        assert!(matches!(
            ReplCommand::parse("SELECT * FROM orders"),
            ReplCommand::Sql(_)
        ));
        assert!(matches!(
            ReplCommand::parse(".unknown"),
            ReplCommand::Unknown(_)
        ));
    }

    #[test]
    fn test_parse_schema() {
        assert_eq!(ReplCommand::parse(".schema"), ReplCommand::Schema(None));
        assert_eq!(
            ReplCommand::parse(".schema orders"),
            ReplCommand::Schema(Some("orders".to_string()))
        );
    }

    #[test]
    fn test_parse_preview() {
        assert_eq!(
            ReplCommand::parse(".preview orders"),
            ReplCommand::Preview("orders".to_string(), None)
        );
        assert_eq!(
            ReplCommand::parse(".PREVIEW orders 20"),
            ReplCommand::Preview("orders".to_string(), Some(20))
        );
        assert!(matches!(
            ReplCommand::parse(".preview"),
            ReplCommand::Unknown(_)
        ));
        assert!(matches!(
            ReplCommand::parse(".preview orders many"),
            ReplCommand::Unknown(_)
        ));
    }

    #[test]
    fn test_parse_help_sql() {
        assert_eq!(ReplCommand::parse(".help sql"), ReplCommand::HelpSql);
        assert_eq!(ReplCommand::parse(".h SQL"), ReplCommand::HelpSql);
        assert_eq!(ReplCommand::parse(".help"), ReplCommand::Help);
    }

    #[test]
    fn test_parse_quoted_table_names() {
        assert_eq!(
            ReplCommand::parse(".rename \"Sales Q1\" orders"),
            ReplCommand::Rename("Sales Q1".to_string(), "orders".to_string())
        );
        assert_eq!(
            ReplCommand::parse(".rename orders \"Q1 \"\"final\"\"\""),
            ReplCommand::Rename("orders".to_string(), "Q1 \"final\"".to_string())
        );
        assert_eq!(
            ReplCommand::parse(".preview \"Sales Q1\" 3"),
            ReplCommand::Preview("Sales Q1".to_string(), Some(3))
        );
        assert_eq!(
            ReplCommand::parse(".drop \"Sales Q1\""),
            ReplCommand::Drop("Sales Q1".to_string())
        );
        assert_eq!(
            ReplCommand::parse(".schema Sales Q1"),
            ReplCommand::Schema(Some("Sales Q1".to_string()))
        );
        assert!(matches!(
            ReplCommand::parse(".rename Sales Q1 orders"),
            ReplCommand::Unknown(_)
        ));
        assert!(matches!(
            ReplCommand::parse(".rename \"Sales Q1 orders"),
            ReplCommand::Unknown(_)
        ));
    }

    #[test]
    fn test_parse_load_rename_drop() {
        assert_eq!(
            ReplCommand::parse(".load data/Sales Q1.xlsx"),
            ReplCommand::Load("data/Sales Q1.xlsx".to_string())
        );
        assert_eq!(
            ReplCommand::parse(".rename sales orders"),
            ReplCommand::Rename("sales".to_string(), "orders".to_string())
        );
        assert_eq!(
            ReplCommand::parse(".drop orders"),
            ReplCommand::Drop("orders".to_string())
        );
        assert!(matches!(ReplCommand::parse(".load"), ReplCommand::Unknown(_)));
        assert!(matches!(
            ReplCommand::parse(".rename sales"),
            ReplCommand::Unknown(_)
        ));
        assert!(matches!(ReplCommand::parse(".drop"), ReplCommand::Unknown(_)));
    }

    #[test]
    fn test_parse_engine() {
        assert_eq!(ReplCommand::parse(".engine"), ReplCommand::Engine(None));
        assert_eq!(
            ReplCommand::parse(".engine datafusion"),
            ReplCommand::Engine(Some("datafusion".to_string()))
        );
    }

    #[test]
    fn test_parse_export_filename_only() {
        assert_eq!(
            ReplCommand::parse(".export output.parquet"),
            ReplCommand::Export("output.parquet".to_string(), None)
        );
        assert_eq!(
            ReplCommand::parse(".export results.csv  "),
            ReplCommand::Export("results.csv".to_string(), None)
        );
    }

    #[test]
    fn test_parse_export_with_query() {
        assert_eq!(
            ReplCommand::parse(".export output.csv SELECT * FROM orders"),
            ReplCommand::Export(
                "output.csv".to_string(),
                Some("SELECT * FROM orders".to_string())
            )
        );
    }

    #[test]
    fn test_parse_export_no_filename() {
        assert!(matches!(
            ReplCommand::parse(".export"),
            ReplCommand::Unknown(_)
        ));
        assert!(matches!(
            ReplCommand::parse(".export "),
            ReplCommand::Unknown(_)
        ));
    }
}
