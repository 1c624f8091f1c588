//! Parser for `boards.txt` / `platform.txt` style config files.
//!
//! The grammar is line-oriented:
//!
//! | Line | Effect |
//! |------|--------|
//! | empty, or starting with `#` | ignored |
//! | `key=value` | recorded in the flat map, assigned into the tree |
//! | `key` (no `=`) | treated as `key=` |
//! | `menu.*=...` | flat map only |
//! | `a.b.<host>=v` | assigned at `a.b`, never replaced by a plain `a.b` line |
//! | `a.b.<other host>=v` | flat map only |
//! | `b.menu.m.<item>=v` | assigned at `b.m_modification` |
//! | key with an empty segment | flat map only |
//!
//! Values are opaque strings.

use bk_core::{ConfigNode, FlatKeyMap, FxHashSet, HostPlatform, fx_hash_set};
use smallvec::SmallVec;

/// Top-level namespace reserved for menu definitions.
const MENU_SEGMENT: &str = "menu";

/// Suffix of the key a menu item is folded into.
const MODIFICATION_SUFFIX: &str = "_modification";

/// Key segments of a typical line fit without allocating.
type Segments<'a> = SmallVec<[&'a str; 8]>;

/// The two views of one parsed config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConfig {
    /// Platform-resolved structured tree.
    pub tree: ConfigNode,
    /// Every accepted line, keyed by its literal left-hand side.
    pub flat: FlatKeyMap,
}

/// Parses config text for one host platform.
///
/// # Examples
///
/// ```
/// use bk_core::HostPlatform;
/// use bk_parser::ConfigParser;
///
/// let parser = ConfigParser::new(HostPlatform::Windows);
/// let parsed = parser.parse("tools.avrdude.cmd.windows=avrdude.exe\nmenu.cpu=Processor\n");
///
/// assert_eq!(parsed.tree.get_str("tools.avrdude.cmd"), Some("avrdude.exe"));
/// assert_eq!(parsed.flat.len(), 2);
/// assert!(parsed.tree.get("menu").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigParser {
    host: HostPlatform,
}

impl ConfigParser {
    /// Creates a parser that resolves overrides for `host`.
    #[must_use]
    pub const fn new(host: HostPlatform) -> Self {
        Self { host }
    }

    /// Returns the host platform overrides are resolved for.
    #[inline]
    #[must_use]
    pub const fn host(&self) -> HostPlatform {
        self.host
    }

    /// Parses UTF-8 text.
    #[must_use]
    pub fn parse(&self, raw: &str) -> ParsedConfig {
        let mut parsed = ParsedConfig::default();
        // Paths assigned from a line carrying the current host's alias.
        let mut host_specific: FxHashSet<String> = fx_hash_set();

        for line in raw.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            parsed.flat.insert(key.to_owned(), value.to_owned());

            let Some((path, specific)) = self.resolve_key(key) else {
                continue;
            };
            if specific {
                parsed.tree.set_path(&path, value);
                host_specific.insert(path);
            } else if !host_specific.contains(&path) {
                parsed.tree.set_path(&path, value);
            }
        }

        parsed
    }

    /// Parses raw bytes, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn parse_bytes(&self, raw: &[u8]) -> ParsedConfig {
        self.parse(&String::from_utf8_lossy(raw))
    }

    /// Maps a literal key to the dotted path it is stored at in the tree,
    /// or `None` if the line stays out of the tree.
    #[must_use]
    pub fn tree_path(&self, key: &str) -> Option<String> {
        self.resolve_key(key).map(|(path, _)| path)
    }

    /// Like [`tree_path`](Self::tree_path), also reporting whether the key
    /// ended in the current host's alias.
    fn resolve_key(&self, key: &str) -> Option<(String, bool)> {
        let mut segments: Segments<'_> = key.split('.').collect();
        let original_len = segments.len();

        if segments.first() == Some(&MENU_SEGMENT) {
            return None;
        }

        let mut specific = false;
        if let Some(last) = segments.last().copied() {
            if last == self.host.alias() {
                segments.pop();
                specific = true;
            } else if HostPlatform::is_known_alias(last) {
                return None;
            }
        }

        if segments.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        if original_len == 4 && segments.get(1) == Some(&MENU_SEGMENT) {
            let path = format!("{}.{}{MODIFICATION_SUFFIX}", segments[0], segments[2]);
            return Some((path, specific));
        }

        Some((segments.join("."), specific))
    }
}

/// Parses `raw` for `host`.
///
/// Shorthand for `ConfigParser::new(host).parse(raw)`.
#[must_use]
pub fn parse_config(raw: &str, host: HostPlatform) -> ParsedConfig {
    ConfigParser::new(host).parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str, host: HostPlatform) -> ParsedConfig {
        parse_config(raw, host)
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let parsed = parse("# comment\n\nname=AVR\n", HostPlatform::Linux);
        assert_eq!(parsed.flat.len(), 1);
        assert_eq!(parsed.tree.get_str("name"), Some("AVR"));
    }

    #[test]
    fn test_whitespace_line_is_a_key() {
        let parsed = parse("  \nname=AVR\n", HostPlatform::Linux);
        assert_eq!(parsed.flat.get("  ").map(String::as_str), Some(""));
        assert_eq!(parsed.flat.len(), 2);
    }

    #[test]
    fn test_flat_map_has_one_entry_per_line() {
        let raw = "\
uno.name=Arduino Uno
uno.build.mcu=atmega328p
tools.avrdude.cmd.windows=avrdude.exe
tools.avrdude.cmd.linux=avrdude
menu.cpu=Processor
";
        let parsed = parse(raw, HostPlatform::MacOs);
        let keys: Vec<_> = parsed.flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "menu.cpu",
                "tools.avrdude.cmd.linux",
                "tools.avrdude.cmd.windows",
                "uno.build.mcu",
                "uno.name",
            ]
        );
    }

    #[test]
    fn test_host_override_promoted() {
        let parsed = parse("tools.avrdude.cmd.windows=avrdude.exe", HostPlatform::Windows);
        assert_eq!(parsed.tree.get_str("tools.avrdude.cmd"), Some("avrdude.exe"));
    }

    #[test]
    fn test_foreign_override_dropped() {
        let parsed = parse("tools.avrdude.cmd.windows=avrdude.exe", HostPlatform::Linux);
        assert!(parsed.tree.lookup("tools.avrdude.cmd").is_none());
        assert_eq!(
            parsed.flat.get("tools.avrdude.cmd.windows").map(String::as_str),
            Some("avrdude.exe")
        );
    }

    #[test]
    fn test_override_replaces_generic_value() {
        let raw = "tools.avrdude.cmd=avrdude\ntools.avrdude.cmd.macos=avrdude-mac\n";
        let parsed = parse(raw, HostPlatform::MacOs);
        assert_eq!(parsed.tree.get_str("tools.avrdude.cmd"), Some("avrdude-mac"));

        let parsed = parse(raw, HostPlatform::Linux);
        assert_eq!(parsed.tree.get_str("tools.avrdude.cmd"), Some("avrdude"));
    }

    #[test]
    fn test_host_override_wins_when_listed_first() {
        let raw = "tools.avrdude.cmd.windows=avrdude.exe\ntools.avrdude.cmd=avrdude\n";
        let parsed = parse(raw, HostPlatform::Windows);
        assert_eq!(parsed.tree.get_str("tools.avrdude.cmd"), Some("avrdude.exe"));
        assert_eq!(parsed.flat.len(), 2);

        let parsed = parse(raw, HostPlatform::Linux);
        assert_eq!(parsed.tree.get_str("tools.avrdude.cmd"), Some("avrdude"));
    }

    #[test]
    fn test_empty_key_stays_out_of_tree() {
        let parsed = parse("=orphan\na..b=gap\n.lead=x\n", HostPlatform::Linux);
        assert!(parsed.tree.is_empty());
        assert_eq!(parsed.flat.get("").map(String::as_str), Some("orphan"));
        assert_eq!(parsed.flat.len(), 3);

        let parser = ConfigParser::new(HostPlatform::Linux);
        assert_eq!(parser.tree_path(""), None);
        assert_eq!(parser.tree_path("a..b"), None);
    }

    #[test]
    fn test_menu_namespace_not_in_tree() {
        let parsed = parse("menu.cpu.atmega328=ATmega328", HostPlatform::Linux);
        assert!(parsed.tree.is_empty());
        assert_eq!(
            parsed.flat.get("menu.cpu.atmega328").map(String::as_str),
            Some("ATmega328")
        );
    }

    #[test]
    fn test_menu_modifier() {
        let parsed = parse("nano.menu.cpu.atmega328=ATmega328P", HostPlatform::Linux);
        assert_eq!(parsed.tree.get_str("nano.cpu_modification"), Some("ATmega328P"));
        assert!(parsed.tree.lookup("nano.menu").is_none());
    }

    #[test]
    fn test_menu_modifier_with_host_alias() {
        let parsed = parse("x.menu.speed.windows=1", HostPlatform::Windows);
        assert_eq!(parsed.tree.get_str("x.speed_modification"), Some("1"));

        let parsed = parse("x.menu.speed.windows=1", HostPlatform::Linux);
        assert!(parsed.tree.is_empty());
    }

    #[test]
    fn test_deep_menu_keys_are_plain_paths() {
        let parsed = parse(
            "nano.menu.cpu.atmega328.build.mcu=atmega328p",
            HostPlatform::Linux,
        );
        assert_eq!(
            parsed.tree.get_str("nano.menu.cpu.atmega328.build.mcu"),
            Some("atmega328p")
        );
    }

    #[test]
    fn test_line_without_equals() {
        let parsed = parse("just.a.key\n", HostPlatform::Linux);
        assert_eq!(parsed.flat.get("just.a.key").map(String::as_str), Some(""));
        assert_eq!(parsed.tree.get_str("just.a.key"), Some(""));
    }

    #[test]
    fn test_value_keeps_later_equals() {
        let parsed = parse("recipe.cmd=a=b=c", HostPlatform::Linux);
        assert_eq!(parsed.tree.get_str("recipe.cmd"), Some("a=b=c"));
    }

    #[test]
    fn test_crlf_lines() {
        let parsed = parse("# header\r\nuno.name=Uno\r\n\r\n", HostPlatform::Linux);
        assert_eq!(parsed.tree.get_str("uno.name"), Some("Uno"));
        assert_eq!(parsed.flat.len(), 1);
    }

    #[test]
    fn test_bare_alias_key_stays_out_of_tree() {
        let parsed = parse("linux=yes", HostPlatform::Linux);
        assert!(parsed.tree.is_empty());
        assert_eq!(parsed.flat.len(), 1);
    }

    #[test]
    fn test_values_are_not_coerced() {
        let parsed = parse("uno.upload.speed=115200\nuno.flag=true", HostPlatform::Linux);
        assert_eq!(parsed.tree.get_str("uno.upload.speed"), Some("115200"));
        assert_eq!(parsed.tree.get_str("uno.flag"), Some("true"));
    }

    #[test]
    fn test_parse_bytes_lossy() {
        let parser = ConfigParser::new(HostPlatform::Linux);
        let parsed = parser.parse_bytes(b"vendor=Acme\xff\nname=ok\n");
        assert_eq!(parsed.tree.get_str("name"), Some("ok"));
        assert!(
            parsed
                .tree
                .get_str("vendor")
                .is_some_and(|v| v.starts_with("Acme"))
        );
    }

    #[test]
    fn test_tree_path() {
        let parser = ConfigParser::new(HostPlatform::Windows);
        assert_eq!(parser.tree_path("a.b.c").as_deref(), Some("a.b.c"));
        assert_eq!(parser.tree_path("a.b.windows").as_deref(), Some("a.b"));
        assert_eq!(parser.tree_path("a.b.macos"), None);
        assert_eq!(parser.tree_path("menu.cpu"), None);
        assert_eq!(
            parser.tree_path("uno.menu.cpu.big").as_deref(),
            Some("uno.cpu_modification")
        );
    }
}
