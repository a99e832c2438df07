use std::error::Error;

use bio::io::fasta;
use log::info;

use crate::io_utils::open_input;

/// Adapter patterns with their KMP failure tables. Built once at startup,
/// read-only while the stream is processed.
#[derive(Debug, Default)]
pub struct AdapterSet {
    patterns: Vec<Vec<u8>>,
    failures: Vec<Vec<usize>>,
}

impl AdapterSet {
    /// Collects the command-line adapter and any adapter-file entries, in that
    /// order. Each pattern is cut down to its leading `min_match` bases: those
    /// anchor the match, and everything past them is adapter sequence that
    /// gets trimmed away regardless.
    pub fn build(
        adapter: Option<&str>,
        adapter_file: Option<&str>,
        min_match: usize,
    ) -> Result<Self, Box<dyn Error>> {
        // a zero match length would clip every pattern to nothing
        if min_match == 0 {
            return Err("minimum adapter match length must be at least 1".into());
        }
        let mut patterns = Vec::new();

        if let Some(a) = adapter {
            validate_adapter(a.as_bytes(), "command line")?;
            patterns.push(clip(a.as_bytes(), min_match));
        }

        if let Some(path) = adapter_file {
            let reader = fasta::Reader::new(open_input(path)?);
            for result in reader.records() {
                let record = result?;
                validate_adapter(record.seq(), path)?;
                patterns.push(clip(record.seq(), min_match));
            }
        }

        info!("loaded {} adapter pattern(s)", patterns.len());
        let failures = patterns.iter().map(|p| failure_table(p)).collect();
        Ok(Self { patterns, failures })
    }

    /// Build directly from pre-clipped patterns. Test scaffolding for scan
    /// scenarios that need a specific pattern order.
    #[cfg(test)]
    pub(crate) fn from_patterns(patterns: Vec<Vec<u8>>) -> Self {
        let failures = patterns.iter().map(|p| failure_table(p)).collect();
        Self { patterns, failures }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns paired with their failure tables, in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[usize])> {
        self.patterns
            .iter()
            .map(Vec::as_slice)
            .zip(self.failures.iter().map(Vec::as_slice))
    }
}

fn clip(seq: &[u8], min_match: usize) -> Vec<u8> {
    seq[..seq.len().min(min_match)].to_vec()
}

fn validate_adapter(seq: &[u8], source: &str) -> Result<(), Box<dyn Error>> {
    if seq.is_empty() {
        return Err(format!("empty adapter sequence in {source}").into());
    }
    for &b in seq {
        match b {
            b'A' | b'C' | b'G' | b'T' | b'U' | b'N' => {}
            other => {
                return Err(format!(
                    "invalid character '{}' in adapter from {source}; \
                     valid characters: A,C,G,T,U,N",
                    other as char
                )
                .into())
            }
        }
    }
    Ok(())
}

/// KMP failure function: `f[i]` is the length of the longest proper prefix of
/// `p[..=i]` that is also a suffix of it.
pub fn failure_table(p: &[u8]) -> Vec<usize> {
    let mut f = vec![0usize; p.len()];
    let mut j = 0;
    for i in 1..p.len() {
        while j > 0 && p[i] != p[j] {
            j = f[j - 1];
        }
        if p[i] == p[j] {
            j += 1;
        }
        f[i] = j;
    }
    f
}
