// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parsing of manual channel specifications.
//!
//! Two shapes are understood: a comma-separated list of channel indices
//! ("0,1,60") and an inclusive underscore range ("60_70"). Anything that
//! doesn't parse, or points outside the dataset's channels, is dropped with a
//! warning rather than treated as an error; a malformed spec just means no
//! manual flags.

use std::collections::HashSet;

use log::warn;

/// The set of channel indices to manually flag. `None` yields the empty set.
pub fn parse_chans(spec: Option<&str>, num_chans: usize) -> HashSet<usize> {
    let spec = match spec {
        Some(s) => s.trim(),
        None => return HashSet::new(),
    };

    if let Some((start, end)) = spec.split_once('_') {
        let (start, end) = match (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
            (Ok(s), Ok(e)) => (s, e),
            _ => {
                warn!("Couldn't parse channel range {spec:?}; not flagging any channels manually");
                return HashSet::new();
            }
        };
        if start > end {
            warn!("Channel range {spec:?} is backwards; not flagging any channels manually");
            return HashSet::new();
        }
        if end >= num_chans {
            warn!("Channel range {spec:?} runs past the last channel ({num_chans} channels); clipping");
        }
        return (start..=end).filter(|&c| c < num_chans).collect();
    }

    let mut chans = HashSet::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<usize>() {
            Ok(c) if c < num_chans => {
                chans.insert(c);
            }
            Ok(c) => warn!("Ignoring channel {c}; the dataset only has {num_chans} channels"),
            Err(_) => warn!("Ignoring unparsable channel {token:?}"),
        }
    }
    chans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_spec_is_empty() {
        assert!(parse_chans(None, 64).is_empty());
    }

    #[test]
    fn list_spec() {
        let chans = parse_chans(Some("0,2,5"), 8);
        assert_eq!(chans, HashSet::from([0, 2, 5]));
    }

    #[test]
    fn range_spec_is_inclusive() {
        let chans = parse_chans(Some("3_6"), 8);
        assert_eq!(chans, HashSet::from([3, 4, 5, 6]));
    }

    #[test]
    fn range_is_clipped_to_channel_count() {
        let chans = parse_chans(Some("6_12"), 8);
        assert_eq!(chans, HashSet::from([6, 7]));
    }

    #[test]
    fn out_of_range_list_entries_are_dropped() {
        let chans = parse_chans(Some("1,100"), 8);
        assert_eq!(chans, HashSet::from([1]));
    }

    #[test]
    fn garbage_is_no_manual_flags() {
        assert!(parse_chans(Some("carrots"), 8).is_empty());
        assert!(parse_chans(Some("5_bananas"), 8).is_empty());
        assert!(parse_chans(Some("9_3"), 8).is_empty());
        assert!(parse_chans(Some(""), 8).is_empty());
    }
}
