//! `$N` placeholder expansion.
//!
//! `$0` is the whole match, `$1..$N` the capture groups. A placeholder
//! naming a group that does not exist or did not participate in the match is
//! left in the output as written. When a run of digits is longer than any
//! valid group index, the longest prefix naming a participating group wins,
//! so with two groups `$10` expands to group 1 followed by `0`.

use regex::Captures;

/// Owned capture groups of one match, indexed by group number.
pub type Groups = Vec<Option<String>>;

/// Collect the groups of a match.
pub fn groups(captures: &Captures<'_>) -> Groups {
    captures
        .iter()
        .map(|group| group.map(|m| m.as_str().to_string()))
        .collect()
}

/// Expand every `$N` in `template` using `groups`.
pub fn expand(template: &str, groups: &[Option<String>]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        match longest_group(after, digits, groups) {
            Some((consumed, text)) => {
                output.push_str(text);
                rest = &after[consumed..];
            }
            None => {
                output.push('$');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

fn longest_group<'g>(
    after: &str,
    digits: usize,
    groups: &'g [Option<String>],
) -> Option<(usize, &'g str)> {
    (1..=digits).rev().find_map(|len| {
        if len > 1 && after.starts_with('0') {
            return None;
        }
        let index: usize = after[..len].parse().ok()?;
        let text = groups.get(index)?.as_deref()?;
        Some((len, text))
    })
}
