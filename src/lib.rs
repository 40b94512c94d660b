//! Deterministic browser-form simulation for Rust integration tests.
//!
//! Given the HTML body returned by a previous request, a [`Session`] lets a
//! test describe user actions at the level a person would ("select January
//! from the month list", "click the submit button") and translates them into
//! the exact parameter set and request a real browser would issue. The
//! resulting `(method, action, parameters)` triple is handed to a
//! [`Transport`] implementation, which performs the actual request and
//! redirect following.
//!
//! ```no_run
//! use form_tester::{MockTransport, Session};
//!
//! # fn main() -> form_tester::Result<()> {
//! let mut session = Session::new(MockTransport::default());
//! session.load_page(r#"
//!     <form method="post" action="/login">
//!       <select name="month"><option value="1">January</option></select>
//!       <input type="submit">
//!     </form>
//! "#)?;
//! session.select_option("January", Some("month"))?;
//! session.click_submit()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

mod dom;
mod html;
mod locator;
mod options;
mod session;

pub use options::OptionSpec;
pub use session::{Method, MockTransport, Session, Submission, Transport};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    ControlNotFound(String),
    AmbiguousControl {
        locator: String,
        count: usize,
    },
    OptionNotFound {
        spec: String,
        control: String,
    },
    NoEnclosingForm(String),
    InvalidPattern(String),
    InvalidState(String),
    Transport(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::ControlNotFound(locator) => write!(f, "no such field: {locator}"),
            Self::AmbiguousControl { locator, count } => {
                write!(f, "locator '{locator}' matches {count} controls")
            }
            Self::OptionNotFound { spec, control } => {
                write!(f, "no option matching {spec} in select '{control}'")
            }
            Self::NoEnclosingForm(control) => {
                write!(f, "control '{control}' has no enclosing form")
            }
            Self::InvalidPattern(msg) => write!(f, "invalid option pattern: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid session state: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
