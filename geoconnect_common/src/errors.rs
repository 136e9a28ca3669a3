//! Error-handling code.

use std::fmt;

use anyhow::Error;

use crate::remote::find_remote_error;
#[cfg(test)]
use crate::remote::RemoteError;

/// Support for displaying an error with a complete list of causes, and an
/// optional backtrace.
pub trait DisplayCausesAndBacktraceExt {
    /// Display the error and its causes, plus a backtrace (if available).
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_>;

    /// Display the error and its causes.
    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_>;
}

impl DisplayCausesAndBacktraceExt for Error {
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: self,
            show_backtrace: true,
        }
    }

    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: self,
            show_backtrace: false,
        }
    }
}

/// Helper type used to display errors.
pub struct DisplayCauses<'a> {
    err: &'a Error,
    show_backtrace: bool,
}

impl fmt::Display for DisplayCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.err)?;
        for cause in self.err.chain().skip(1) {
            writeln!(f, "  caused by: {}", cause)?;
        }
        if self.show_backtrace {
            write!(f, "{}", self.err.backtrace())?;
        }
        Ok(())
    }
}

/// The message we show a person using the web pages. Failures talking to
/// WorldMap or Dataverse already carry a message written for users, so we
/// pass those through. Anything else is an internal problem, and the details
/// belong in the logs.
pub fn user_facing_message(err: &Error) -> String {
    match find_remote_error(err) {
        Some(remote) => remote.to_string(),
        None => "Sorry! Something went wrong. Please try again later.".to_owned(),
    }
}

/// Generate a `main` function which calls the specified function. If the
/// function returns `Result::Err(_)`, then `main` will print the error and exit
/// with a non-zero status code.
#[macro_export]
macro_rules! quick_main {
    ($wrapped:ident) => {
        fn main() {
            if let Err(err) = $wrapped() {
                use ::std::io::Write;
                use $crate::errors::DisplayCausesAndBacktraceExt;
                let stderr = ::std::io::stderr();
                write!(&mut stderr.lock(), "{}", err.display_causes_and_backtrace())
                    .expect("Error occurred while trying to display error");
                ::std::process::exit(1);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::time::Duration;

    #[test]
    fn causes_are_listed() {
        let err = Err::<(), _>(anyhow::format_err!("disk on fire"))
            .context("could not save shapefile")
            .unwrap_err();
        let shown = err.display_causes_without_backtrace().to_string();
        assert_eq!(
            shown,
            "ERROR: could not save shapefile\n  caused by: disk on fire\n"
        );
    }

    #[test]
    fn remote_errors_are_shown_to_users() {
        let err = Error::new(RemoteError::Timeout {
            limit: Duration::from_secs(240),
        })
        .context("error sending shapefile to WorldMap");
        assert_eq!(
            user_facing_message(&err),
            "This request timed out.  (Time limit: 240 seconds(s))"
        );

        let internal = anyhow::format_err!("connection pool exhausted");
        assert!(!user_facing_message(&internal).contains("pool"));
    }
}
