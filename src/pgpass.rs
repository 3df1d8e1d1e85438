//! `.pgpass`/`PGPASSFILE` passfile lookup (§4.9), consulted when no password is set explicitly.

use std::borrow::Cow;
use std::env::var_os;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::options::PgConnectOptions;

pub(crate) fn find_password(options: &PgConnectOptions) -> Option<String> {
    if let Some(file) = var_os("PGPASSFILE") {
        if let Some(password) = load_from_file(PathBuf::from(file), options) {
            return Some(password);
        }
    }

    #[cfg(not(target_os = "windows"))]
    let default_file = dirs::home_dir().map(|path| path.join(".pgpass"));
    #[cfg(target_os = "windows")]
    let default_file = dirs::data_dir().map(|path| path.join("postgres").join("pgpass.conf"));

    load_from_file(default_file?, options)
}

fn load_from_file(path: PathBuf, options: &PgConnectOptions) -> Option<String> {
    let file = File::open(&path).ok()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = file.metadata().ok()?.permissions().mode();
        if mode & 0o77 != 0 {
            log::warn!(
                "ignoring {}: permissions are not strict enough (found {:o}, expected at most 0600)",
                path.display(),
                mode
            );
            return None;
        }
    }

    load_from_reader(
        BufReader::new(file),
        &options.host,
        options.port,
        &options.username,
        options.database.as_deref(),
    )
}

fn load_from_reader(
    mut reader: impl BufRead,
    host: &str,
    port: u16,
    username: &str,
    database: Option<&str>,
) -> Option<String> {
    let mut line = String::new();

    while let Ok(n) = reader.read_line(&mut line) {
        if n == 0 {
            break;
        }

        if !line.starts_with('#') {
            trim_newline(&mut line);
            if let Some(password) = match_line(&line, host, port, username, database) {
                return Some(password);
            }
        }

        line.clear();
    }

    None
}

fn trim_newline(s: &mut String) {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
}

/// Pgpass field order is `hostname:port:database:username:password`, with `*` as a wildcard
/// in any of the first four fields. <https://www.postgresql.org/docs/current/libpq-pgpass.html>
fn match_line(
    mut line: &str,
    host: &str,
    port: u16,
    username: &str,
    database: Option<&str>,
) -> Option<String> {
    let whole_line = line;

    match line.trim_start().chars().next() {
        None | Some('#') => None,
        _ => {
            matches_field(whole_line, &mut line, host)?;
            matches_field(whole_line, &mut line, &port.to_string())?;
            matches_field(whole_line, &mut line, database.unwrap_or_default())?;
            matches_field(whole_line, &mut line, username)?;
            Some(line.to_owned())
        }
    }
}

fn matches_field(whole_line: &str, line: &mut &str, value: &str) -> Option<()> {
    match next_field(line) {
        Some(field) if field == "*" || field == value => Some(()),
        Some(_) => None,
        None => {
            log::warn!("malformed line in pgpass file: {whole_line}");
            None
        }
    }
}

/// Splits the next `:`-delimited field off the front of `line`, honoring `\:`/`\\` escapes, and
/// advances `line` past the delimiter.
fn next_field<'a>(line: &mut &'a str) -> Option<Cow<'a, str>> {
    let mut escaping = false;
    let mut escaped = None::<String>;
    let mut last_added = 0;

    for (idx, c) in line.char_indices() {
        if c == ':' && !escaping {
            let (field, rest) = line.split_at(idx);
            *line = &rest[1..];

            return Some(if let Some(mut escaped) = escaped {
                escaped += &field[last_added..];
                Cow::Owned(escaped)
            } else {
                Cow::Borrowed(field)
            });
        } else if c == '\\' {
            let s = escaped.get_or_insert_with(String::new);

            if escaping {
                s.push('\\');
            } else {
                *s += &line[last_added..idx];
            }

            escaping = !escaping;
            last_added = idx + 1;
        } else {
            escaping = false;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{load_from_reader, match_line, next_field};
    use std::borrow::Cow;

    #[test]
    fn it_splits_escaped_fields() {
        fn case<'a>(mut input: &'a str, expected: Option<Cow<'a, str>>, rest: &str) {
            assert_eq!(next_field(&mut input), expected);
            assert_eq!(input, rest);
        }

        case("foo:bar:baz", Some(Cow::Borrowed("foo")), "bar:baz");
        case("foo\\\\:bar:baz", Some(Cow::Owned("foo\\".to_owned())), "bar:baz");
        case("foo\\::bar:baz", Some(Cow::Owned("foo:".to_owned())), "bar:baz");
        case("foo", None, "foo");
    }

    #[test]
    fn it_matches_a_line_with_wildcards() {
        assert_eq!(
            match_line("localhost:5432:bar:foo:baz", "localhost", 5432, "foo", Some("bar")),
            Some("baz".to_owned())
        );
        assert_eq!(
            match_line("*:5432:bar:foo:baz", "localhost", 5432, "foo", Some("bar")),
            Some("baz".to_owned())
        );
        assert_eq!(
            match_line("thishost:5432:bar:foo:baz", "thathost", 5432, "foo", Some("bar")),
            None
        );
    }

    #[test]
    fn it_reads_the_first_matching_line() {
        let file = b"\
            localhost:5432:bar:foo:baz\n\
            # a comment\n\
            *:5432:bar:foo:wildcard\r\n\
            localhost:5432:*:foo:nodb\n\
        ";

        assert_eq!(
            load_from_reader(&file[..], "localhost", 5432, "foo", Some("bar")),
            Some("baz".to_owned())
        );
        assert_eq!(
            load_from_reader(&file[..], "localhost", 5432, "foo", Some("other")),
            Some("wildcard".to_owned())
        );
        assert_eq!(load_from_reader(&file[..], "nope", 5432, "foo", Some("bar")), None);
    }
}
