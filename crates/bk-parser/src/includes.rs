//! Header-dependency extraction from C/C++ source text.
//!
//! Scanning is purely textual: conditionals and macros are not evaluated,
//! so a directive inside `#if 0` still counts.

use std::collections::BTreeSet;

use crate::error::ParseError;
use crate::patterns::include_regex;

/// Returns the set of header stems included by `source`.
///
/// `#include <Wire.h>` and `#include "Servo.h"` both contribute their stem
/// (`Wire`, `Servo`). Headers without a `.h` suffix are not matched.
///
/// # Errors
///
/// Returns [`ParseError::PatternCompile`] only if the built-in pattern is
/// broken.
///
/// # Examples
///
/// ```
/// use bk_parser::extract_include_names;
///
/// let source = "#include <Wire.h>\n#include \"Servo.h\"\n#include <Wire.h>\n";
/// let names = extract_include_names(source)?;
/// assert_eq!(names.into_iter().collect::<Vec<_>>(), ["Servo", "Wire"]);
/// # Ok::<(), bk_parser::ParseError>(())
/// ```
pub fn extract_include_names(source: &str) -> Result<BTreeSet<String>, ParseError> {
    let mut names = BTreeSet::new();
    extend_include_names(source, &mut names)?;
    Ok(names)
}

/// Adds the header stems included by `source` to `names`.
///
/// Returns how many names were new.
///
/// # Errors
///
/// Returns [`ParseError::PatternCompile`] only if the built-in pattern is
/// broken.
pub fn extend_include_names(
    source: &str,
    names: &mut BTreeSet<String>,
) -> Result<usize, ParseError> {
    let regex = include_regex()?;
    let before = names.len();
    for caps in regex.captures_iter(source) {
        if let Some(name) = caps.get(1) {
            names.insert(name.as_str().to_owned());
        }
    }
    Ok(names.len() - before)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        extract_include_names(source).unwrap().into_iter().collect()
    }

    #[test]
    fn test_angle_and_quote_forms() {
        let source = "#include <Wire.h>\n#include \"Servo.h\"\n";
        assert_eq!(names(source), ["Servo", "Wire"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let source = "#include <Wire.h>\n#include <Wire.h>\n#include \"Wire.h\"\n";
        assert_eq!(names(source), ["Wire"]);
    }

    #[test]
    fn test_leading_whitespace_and_spacing() {
        let source = "   #include    <SPI.h>\n\t#include\t\"SD.h\"\n";
        assert_eq!(names(source), ["SD", "SPI"]);
    }

    #[test]
    fn test_ignores_non_header_and_commented_text() {
        let source = "\
// #include <Commented.h>
#include <vector>
#include \"local.hpp\"
int x; #include <Inline.h>
#define INCLUDE <Macro.h>
";
        assert!(names(source).is_empty());
    }

    #[test]
    fn test_subdirectory_headers_keep_prefix() {
        assert_eq!(names("#include <avr/pgmspace.h>\n"), ["avr/pgmspace"]);
    }

    #[test]
    fn test_crlf_source() {
        let source = "#include <Wire.h>\r\n#include \"Servo.h\"\r\n";
        assert_eq!(names(source), ["Servo", "Wire"]);
    }

    #[test]
    fn test_extend_counts_new_names() {
        let mut set = BTreeSet::new();
        assert_eq!(extend_include_names("#include <A.h>\n", &mut set).unwrap(), 1);
        assert_eq!(
            extend_include_names("#include <A.h>\n#include <B.h>\n", &mut set).unwrap(),
            1
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_source() {
        assert!(names("").is_empty());
    }
}
