/// Counters accumulated over the whole stream by the trimming stages.
/// Monotonic; read only after the last record has been processed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsReport {
    pub reads_read: u64,
    pub reads_adapter_trimmed: u64,
    pub reads_adapter_filtered: u64,
    pub bases_adapter_trimmed: u64,
    pub reads_quality_trimmed: u64,
    pub reads_quality_filtered: u64,
    pub bases_quality_trimmed: u64,
}

impl StatsReport {
    /// Summary on stderr, counters right-aligned to the widest value.
    /// Each section appears only when its stage actually ran.
    pub fn print(&self, trim_adapters: bool, trim_quality: bool) {
        let max = self
            .reads_read
            .max(self.bases_adapter_trimmed)
            .max(self.bases_quality_trimmed);
        let w = max.to_string().len();

        eprintln!("{:>w$} reads were read", self.reads_read);
        if trim_adapters {
            eprintln!(
                "{:>w$} reads underwent adapter trimming",
                self.reads_adapter_trimmed
            );
            eprintln!("{:>w$} of these were filtered", self.reads_adapter_filtered);
            eprintln!(
                "{:>w$} adapter bases were trimmed",
                self.bases_adapter_trimmed
            );
        }
        if trim_quality {
            eprintln!(
                "{:>w$} reads underwent quality trimming",
                self.reads_quality_trimmed
            );
            eprintln!("{:>w$} of these were filtered", self.reads_quality_filtered);
            eprintln!(
                "{:>w$} bases were quality trimmed",
                self.bases_quality_trimmed
            );
        }
    }
}
