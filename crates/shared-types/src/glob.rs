//! # Glob Compilation
//!
//! Turns `*`/`?` patterns into anchored regexes.
//!
//! | Pattern | Regex | Matches |
//! |---------|-------|---------|
//! | `*` | `^.*$` | any string, including empty |
//! | `?` | `^.$` | exactly one character |
//! | `user:*` | `^user:.*$` | `user:login`, `user:login:success` |
//! | `a.b?` | `^a\.b.$` | `a.bc` (the dot is literal) |

use regex::Regex;

/// Returns true if the pattern contains a glob metacharacter (`*` or `?`).
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Compile a glob into an anchored regex.
///
/// Every regex metacharacter is escaped first, then `*` becomes `.*` and `?`
/// becomes `.`. Both substitutions apply in the same pattern, so `"a*b?"`
/// compiles to `^a.*b.$`.
pub fn compile_glob(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() * 2 + 2);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => {
                let mut buf = [0u8; 4];
                source.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    source.push('$');
    Regex::new(&source)
}
