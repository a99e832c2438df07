use crate::adapters::AdapterSet;
use crate::record::Record;
use crate::stats::StatsReport;

/// Per-run trimming thresholds, parsed once from the command line.
#[derive(Debug, Clone)]
pub struct TrimPolicy {
    /// Quality stage runs only when a threshold was given.
    pub quality_threshold: Option<u8>,
    /// 33 or 64, the encoding shift of the stored quality characters.
    pub phred_offset: u8,
    pub min_length: usize,
    pub min_mean_quality: u32,
    pub min_adapter_match: usize,
    pub keep_empty: bool,
}

/// Runs the adapter stage then the quality stage over one read,
/// short-circuiting when a stage filters it. Returns the pass/fail verdict;
/// retention of failed reads is the caller's policy.
pub fn process_record(
    rec: &mut Record,
    adapters: &AdapterSet,
    policy: &TrimPolicy,
    stats: &mut StatsReport,
) -> bool {
    if !adapters.is_empty() && !adapter_trim(rec, adapters, policy.min_length, stats) {
        return false;
    }
    if let Some(threshold) = policy.quality_threshold {
        return quality_trim(rec, threshold, policy, stats);
    }
    true
}

/// Scans the sequence against every adapter pattern in order; the first full
/// match wins and no further patterns are tried. Patterns are already clipped
/// to their leading anchor bases, so a match anywhere is taken as adapter
/// sequence running to the end of the read and the read is truncated at the
/// match start.
pub fn adapter_trim(
    rec: &mut Record,
    adapters: &AdapterSet,
    min_length: usize,
    stats: &mut StatsReport,
) -> bool {
    let len = rec.len();
    let mut hit = None;

    'patterns: for (pat, fail) in adapters.iter() {
        let seq = rec.seq();
        let mut i = 0;
        let mut j = 0;
        while i < len {
            if seq[i] == pat[j] {
                if j == pat.len() - 1 {
                    hit = Some(i + 1 - pat.len());
                    break 'patterns;
                }
                i += 1;
                j += 1;
            } else if j > 0 {
                j = fail[j - 1];
            } else {
                i += 1;
            }
        }
    }

    match hit {
        None => true,
        Some(m) => {
            stats.reads_adapter_trimmed += 1;
            stats.bases_adapter_trimmed += (len - m) as u64;
            if m < min_length {
                rec.clear_seq();
                stats.reads_adapter_filtered += 1;
                false
            } else {
                rec.truncate(m);
                true
            }
        }
    }
}

/// Keeps the best-scoring contiguous window of the quality string. Scores are
/// shifted by `threshold + phred_offset`, so bases below the threshold weigh
/// negative; a single forward pass skips the leading low-quality run and then
/// tracks the running sum over alternating above/below-threshold runs, taking
/// the end position where the sum peaks. The peak updates only on a strict
/// improvement, so the earliest-ending maximal window wins ties.
pub fn quality_trim(
    rec: &mut Record,
    threshold: u8,
    policy: &TrimPolicy,
    stats: &mut StatsReport,
) -> bool {
    let q = threshold as i64 + policy.phred_offset as i64;
    let len = rec.len();

    let (start, end, max) = {
        let qual = rec.qual();
        let mut i = 0;
        while i < len && (qual[i] as i64) < q {
            i += 1;
        }
        let start = i;
        let mut sum = 0i64;
        let mut max = 0i64;
        let mut end = 0usize;
        while i < len {
            while i < len && (qual[i] as i64) >= q {
                sum += qual[i] as i64 - q;
                i += 1;
            }
            if sum > max {
                max = sum;
                end = i;
            }
            while i < len && (qual[i] as i64) < q {
                sum += qual[i] as i64 - q;
                i += 1;
            }
        }
        (start, end, max)
    };

    let kept = end.saturating_sub(start);
    if kept == len {
        // nothing was cut; trivial windows are never filtered
        return true;
    }

    rec.keep_window(start, end.max(start));
    stats.reads_quality_trimmed += 1;
    stats.bases_quality_trimmed += (len - kept) as u64;

    if kept < policy.min_length || (max as f32 / kept as f32) < policy.min_mean_quality as f32 {
        rec.clear_seq();
        stats.reads_quality_filtered += 1;
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{adapter_trim, process_record, quality_trim, TrimPolicy};
    use crate::adapters::AdapterSet;
    use crate::record::Record;
    use crate::stats::StatsReport;

    fn rec(seq: &[u8], qual: &[u8]) -> Record {
        let mut r = Record::new();
        let (header, seq_buf, comment, qual_buf) = r.buffers_mut();
        header.extend_from_slice(b"@r1");
        seq_buf.extend_from_slice(seq);
        comment.extend_from_slice(b"+");
        qual_buf.extend_from_slice(qual);
        r.reset_window();
        r
    }

    fn policy() -> TrimPolicy {
        TrimPolicy {
            quality_threshold: None,
            phred_offset: 0,
            min_length: 0,
            min_mean_quality: 0,
            min_adapter_match: 12,
            keep_empty: false,
        }
    }

    fn random_seq(seed: &mut u64, len: usize) -> Vec<u8> {
        const BASES: &[u8] = b"ACGT";
        (0..len)
            .map(|_| {
                *seed = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                BASES[(*seed >> 33) as usize % 4]
            })
            .collect()
    }

    fn naive_find(seq: &[u8], pat: &[u8]) -> Option<usize> {
        if pat.is_empty() || pat.len() > seq.len() {
            return None;
        }
        (0..=seq.len() - pat.len()).find(|&s| &seq[s..s + pat.len()] == pat)
    }

    #[test]
    fn adapter_match_agrees_with_brute_force_search() {
        let mut seed = 0x5eed;
        for _ in 0..200 {
            let seq = random_seq(&mut seed, 40);
            let pat = random_seq(&mut seed, 3);
            let set = AdapterSet::from_patterns(vec![pat.clone()]);
            let mut r = rec(&seq, &vec![b'I'; seq.len()]);
            let mut stats = StatsReport::default();
            let passed = adapter_trim(&mut r, &set, 0, &mut stats);
            assert!(passed);
            match naive_find(&seq, &pat) {
                Some(m) => {
                    assert_eq!(r.len(), m, "seq {:?} pat {:?}", seq, pat);
                    assert_eq!(r.seq(), &seq[..m]);
                    assert_eq!(stats.bases_adapter_trimmed, (seq.len() - m) as u64);
                }
                None => {
                    assert_eq!(r.seq(), &seq[..]);
                    assert_eq!(stats.reads_adapter_trimmed, 0);
                }
            }
        }
    }

    #[test]
    fn trimmed_plus_kept_equals_original() {
        let set = AdapterSet::build(Some("GGGGTTTT"), None, 8).unwrap();
        let mut r = rec(b"AAAACCCCGGGGTTTTACGT", &[b'I'; 20]);
        let mut stats = StatsReport::default();
        assert!(adapter_trim(&mut r, &set, 4, &mut stats));
        assert_eq!(r.seq(), b"AAAACCCC");
        assert_eq!(r.qual().len(), 8);
        assert_eq!(r.len() as u64 + stats.bases_adapter_trimmed, 20);
    }

    #[test]
    fn first_pattern_wins_even_when_a_later_one_matches_earlier() {
        // CCCC matches at 4, AAAA at 0; pattern order decides, not position
        let set = AdapterSet::from_patterns(vec![b"CCCC".to_vec(), b"AAAA".to_vec()]);
        let mut r = rec(b"AAAACCCCGGGG", &[b'I'; 12]);
        let mut stats = StatsReport::default();
        assert!(adapter_trim(&mut r, &set, 1, &mut stats));
        assert_eq!(r.seq(), b"AAAA");
        assert_eq!(stats.reads_adapter_trimmed, 1);
    }

    #[test]
    fn full_length_match_filters_below_min_length() {
        let set = AdapterSet::build(Some("ACGT"), None, 4).unwrap();
        let mut r = rec(b"ACGTACGT", &[b'I'; 8]);
        let mut stats = StatsReport::default();
        let passed = adapter_trim(&mut r, &set, 1, &mut stats);
        assert!(!passed);
        assert!(r.is_empty());
        assert_eq!(stats.reads_adapter_trimmed, 1);
        assert_eq!(stats.reads_adapter_filtered, 1);
        assert_eq!(stats.bases_adapter_trimmed, 8);
    }

    #[test]
    fn unmatched_read_passes_unchanged() {
        let set = AdapterSet::build(Some("TTTTGGGG"), None, 8).unwrap();
        let mut r = rec(b"ACACACACACAC", &[b'I'; 12]);
        let mut stats = StatsReport::default();
        assert!(adapter_trim(&mut r, &set, 1, &mut stats));
        assert_eq!(r.seq(), b"ACACACACACAC");
        assert_eq!(stats.reads_adapter_trimmed, 0);
    }

    #[test]
    fn quality_window_keeps_the_high_run() {
        // scores 10,10,30,30,30,10,10 at offset 0, threshold 20
        let mut r = rec(b"ACGTACG", &[10, 10, 30, 30, 30, 10, 10]);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.min_length = 1;
        assert!(quality_trim(&mut r, 20, &p, &mut stats));
        assert_eq!(r.seq(), b"GTA");
        assert_eq!(r.qual(), &[30, 30, 30]);
        assert_eq!(stats.reads_quality_trimmed, 1);
        assert_eq!(stats.bases_quality_trimmed, 4);
    }

    #[test]
    fn all_below_threshold_is_always_filtered() {
        let mut r = rec(b"ACGT", &[10, 10, 10, 10]);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.min_length = 1;
        let passed = quality_trim(&mut r, 20, &p, &mut stats);
        assert!(!passed);
        assert!(r.is_empty());
        assert_eq!(stats.reads_quality_filtered, 1);
        assert_eq!(stats.bases_quality_trimmed, 4);
    }

    #[test]
    fn untouched_read_is_never_quality_filtered() {
        // every base above threshold: no trim happened, so neither the length
        // nor the mean-quality filter may fire
        let mut r = rec(b"ACGT", &[30, 30, 30, 30]);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.min_length = 100;
        p.min_mean_quality = 1000;
        assert!(quality_trim(&mut r, 20, &p, &mut stats));
        assert_eq!(r.len(), 4);
        assert_eq!(stats.reads_quality_trimmed, 0);
        assert_eq!(stats.reads_quality_filtered, 0);
    }

    #[test]
    fn quality_trim_is_idempotent_on_clean_windows() {
        let mut r = rec(b"ACGTAC", &[10, 30, 30, 30, 30, 10]);
        let mut stats = StatsReport::default();
        let p = policy();
        assert!(quality_trim(&mut r, 20, &p, &mut stats));
        assert_eq!(r.seq(), b"CGTA");
        let trimmed_once = stats.bases_quality_trimmed;
        assert!(quality_trim(&mut r, 20, &p, &mut stats));
        assert_eq!(r.seq(), b"CGTA");
        assert_eq!(stats.bases_quality_trimmed, trimmed_once);
        assert_eq!(stats.reads_quality_trimmed, 1);
    }

    #[test]
    fn ties_keep_the_earliest_window() {
        // two equal-scoring runs; the peak only updates on strict improvement
        let mut r = rec(b"ACG", &[30, 10, 30]);
        let mut stats = StatsReport::default();
        assert!(quality_trim(&mut r, 20, &policy(), &mut stats));
        assert_eq!(r.seq(), b"A");
        assert_eq!(r.qual(), &[30]);
    }

    #[test]
    fn kept_window_sum_is_maximal_from_its_start() {
        // the window always begins at the first above-threshold base; its
        // score must beat every other end position from that start
        let mut seed = 0xfeed;
        for _ in 0..100 {
            let len = 20;
            let qual: Vec<u8> = random_seq(&mut seed, len)
                .iter()
                .map(|b| match b {
                    b'A' => 5u8,
                    b'C' => 15,
                    b'G' => 25,
                    _ => 35,
                })
                .collect();
            let seq = vec![b'A'; len];
            let mut r = rec(&seq, &qual);
            let mut stats = StatsReport::default();
            quality_trim(&mut r, 20, &policy(), &mut stats);

            let q = 20i64;
            let start = qual.iter().position(|&b| b as i64 >= q).unwrap_or(len);
            let best = (start..=len)
                .map(|e| qual[start..e].iter().map(|&b| b as i64 - q).sum::<i64>())
                .max()
                .unwrap_or(0)
                .max(0);
            let kept: i64 = r.qual().iter().map(|&b| b as i64 - q).sum();
            assert_eq!(kept, best, "qual {:?}", qual);
        }
    }

    #[test]
    fn mean_quality_filter_applies_after_a_trim() {
        // window [1,3) keeps two bases scoring (21-20)*2 = 2; mean 1 < 5
        let mut r = rec(b"ACGT", &[10, 21, 21, 10]);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.min_length = 1;
        p.min_mean_quality = 5;
        let passed = quality_trim(&mut r, 20, &p, &mut stats);
        assert!(!passed);
        assert!(r.is_empty());
        assert_eq!(stats.reads_quality_filtered, 1);
    }

    #[test]
    fn phred_offset_shifts_the_threshold() {
        // stored chars are score+33; threshold 20 at offset 33 keeps the 30s
        let qual: Vec<u8> = [10u8, 30, 30, 10].iter().map(|q| q + 33).collect();
        let mut r = rec(b"ACGT", &qual);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.phred_offset = 33;
        p.min_length = 1;
        assert!(quality_trim(&mut r, 20, &p, &mut stats));
        assert_eq!(r.seq(), b"CG");
    }

    #[test]
    fn pipeline_short_circuits_on_adapter_filter() {
        let set = AdapterSet::build(Some("ACGT"), None, 4).unwrap();
        let mut r = rec(b"ACGTACGT", &[10; 8]);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.quality_threshold = Some(20);
        p.min_length = 1;
        let passed = process_record(&mut r, &set, &p, &mut stats);
        assert!(!passed);
        // the quality stage never saw the read
        assert_eq!(stats.reads_quality_trimmed, 0);
        assert_eq!(stats.reads_adapter_filtered, 1);
    }

    #[test]
    fn pipeline_runs_quality_after_adapter_pass() {
        let set = AdapterSet::build(Some("GGGG"), None, 4).unwrap();
        let mut qual = vec![30u8; 12];
        qual[7] = 5; // tail of what the adapter stage leaves behind
        let mut r = rec(b"ACGTACGTGGGG", &qual);
        let mut stats = StatsReport::default();
        let mut p = policy();
        p.quality_threshold = Some(20);
        p.min_length = 1;
        let passed = process_record(&mut r, &set, &p, &mut stats);
        assert!(passed);
        assert_eq!(r.seq(), b"ACGTACG");
        assert_eq!(stats.reads_adapter_trimmed, 1);
        assert_eq!(stats.reads_quality_trimmed, 1);
    }
}
