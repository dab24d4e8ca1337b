//! Conversion between the two spawn-weight representations.
//!
//! On disk every weight list is cumulative so the engine can sample with a
//! single `0..10000` roll and a linear scan. The edit form is relative:
//! each entry's share, reduced by the list's GCD so the numbers stay
//! human-sized.

use mappa_types::floor::MAX_WEIGHT;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Convert a cumulative weight list to GCD-reduced relative weights.
///
/// A zero entry stays zero (the slot cannot spawn); a nonzero entry's
/// relative weight is its distance from the previous nonzero entry.
pub fn relativize(absolute: &[u16]) -> Vec<u32> {
    let mut rel: Vec<u32> = Vec::with_capacity(absolute.len());
    let mut last_nonzero: u32 = 0;
    for &abs in absolute {
        if abs == 0 {
            rel.push(0);
        } else {
            rel.push(u32::from(abs).saturating_sub(last_nonzero));
            last_nonzero = u32::from(abs);
        }
    }

    let g = rel.iter().copied().filter(|&r| r != 0).fold(0, gcd);
    if g > 1 {
        for r in &mut rel {
            *r /= g;
        }
    }
    rel
}

/// Convert keyed relative weights back to the cumulative form.
///
/// Entries are sorted by key ascending (the storage order), shares are
/// scaled to sum to 10000, and the final nonzero entry is bumped to
/// exactly 10000 to absorb integer-division loss.
pub fn normalize<K: Ord + Copy>(entries: &[(K, u32)]) -> Vec<(K, u16)> {
    let mut sorted: Vec<(K, u32)> = entries.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let total: u64 = sorted.iter().map(|(_, r)| u64::from(*r)).sum();
    let mut out: Vec<(K, u16)> = Vec::with_capacity(sorted.len());
    if total == 0 {
        out.extend(sorted.iter().map(|(k, _)| (*k, 0)));
        return out;
    }

    let mut last_cum: u64 = 0;
    for (k, r) in &sorted {
        if *r == 0 {
            out.push((*k, 0));
        } else {
            last_cum += u64::from(MAX_WEIGHT) * u64::from(*r) / total;
            out.push((*k, last_cum as u16));
        }
    }

    if last_cum != 0 && last_cum != u64::from(MAX_WEIGHT) {
        if let Some(last) = out.iter_mut().rev().find(|(_, w)| *w != 0) {
            last.1 = MAX_WEIGHT;
        }
    }
    out
}

/// Presentation percentage of one relative weight, 3-decimal formatted.
pub fn format_percent(rel: u32, total: u32) -> String {
    if total == 0 {
        return "0.000".into();
    }
    let scaled = u64::from(rel) * 100_000 / u64::from(total);
    format!("{}.{:03}", scaled / 1000, scaled % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relativize_basic() {
        assert_eq!(relativize(&[2500, 5000, 10000]), vec![1, 1, 2]);
    }

    #[test]
    fn relativize_skips_zero_slots() {
        // Zero slots neither spawn nor move the running base.
        assert_eq!(relativize(&[0, 5000, 0, 10000]), vec![0, 1, 0, 1]);
    }

    #[test]
    fn relativize_without_common_divisor() {
        assert_eq!(relativize(&[3333, 6666, 10000]), vec![3333, 3333, 3334]);
    }

    #[test]
    fn normalize_bumps_final_entry_to_10000() {
        // 3/3/3 does not divide 10000 evenly; the tail absorbs the loss.
        let out = normalize(&[(0u16, 3), (1, 3), (2, 3)]);
        assert_eq!(out, vec![(0, 3333), (1, 6666), (2, 10000)]);
    }

    #[test]
    fn normalize_sorts_by_key() {
        let out = normalize(&[(5u16, 1), (1, 1)]);
        assert_eq!(out, vec![(1, 5000), (5, 10000)]);
    }

    #[test]
    fn normalize_all_zero() {
        let out = normalize(&[(0u16, 0), (1, 0)]);
        assert_eq!(out, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn normalize_zero_entries_stay_zero() {
        let out = normalize(&[(0u16, 1), (1, 0), (2, 1)]);
        assert_eq!(out, vec![(0, 5000), (1, 0), (2, 10000)]);
    }

    #[test]
    fn round_trip_is_identity_on_reduced_lists() {
        // Totals that divide 10000 evenly survive the flooring unchanged.
        for rel in [vec![1u32, 1, 2], vec![3, 3, 3, 1], vec![0, 2, 0, 3, 5], vec![1, 4]] {
            let keyed: Vec<(u16, u32)> = rel
                .iter()
                .enumerate()
                .map(|(i, r)| (i as u16, *r))
                .collect();
            let abs: Vec<u16> = normalize(&keyed).into_iter().map(|(_, w)| w).collect();
            assert_eq!(relativize(&abs), rel, "round trip of {rel:?}");
        }
    }

    #[test]
    fn single_entry_normalizes_to_exactly_10000() {
        let out = normalize(&[(0u16, 7)]);
        assert_eq!(out, vec![(0, 10000)]);
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(1, 3), "33.333");
        assert_eq!(format_percent(1, 1), "100.000");
        assert_eq!(format_percent(0, 5), "0.000");
        assert_eq!(format_percent(1, 0), "0.000");
        assert_eq!(format_percent(1, 8), "12.500");
    }
}
