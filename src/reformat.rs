//! Formatting pass run before matching.
//!
//! Replacement strings are written against the reformatted text, so the
//! reformatter must be deterministic. [`Normalizer`] only touches whitespace;
//! anything smarter can be plugged in through [`Reformatter`].

/// Pure text-to-text transform applied before replacements are matched.
pub trait Reformatter {
    fn reformat(&self, text: &str) -> String;
}

impl<F> Reformatter for F
where
    F: Fn(&str) -> String,
{
    fn reformat(&self, text: &str) -> String {
        self(text)
    }
}

/// Leaves text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Reformatter for Identity {
    fn reformat(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Whitespace normalizer.
///
/// - CRLF and lone CR become LF
/// - leading tabs expand to `indent_size` spaces
/// - trailing whitespace is stripped
/// - runs of blank lines collapse to a single blank line
/// - a trailing newline is kept only if the input had one
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    pub indent_size: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { indent_size: 2 }
    }
}

impl Reformatter for Normalizer {
    fn reformat(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");
        let had_trailing_newline = unified.ends_with('\n');

        let mut out = String::with_capacity(unified.len());
        let mut previous_blank = false;
        for line in unified.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                if previous_blank {
                    continue;
                }
                previous_blank = true;
            } else {
                previous_blank = false;
            }

            let body = line.trim_start_matches('\t');
            let tabs = line.len() - body.len();
            out.push_str(&" ".repeat(tabs * self.indent_size));
            out.push_str(body);
            out.push('\n');
        }

        if !had_trailing_newline {
            out.pop();
        }
        out
    }
}
