use std::fmt;
use std::time::Duration;

/// Enumeration strategy of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// `?page=N`
    Page,
    /// `?size=N`
    Size,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub kind: ProbeKind,
    pub value: usize,
    pub url: String,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ProbeKind::Page => write!(f, "page={}", self.value),
            ProbeKind::Size => write!(f, "size={}", self.value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Highest page index probed (pages start at 2)
    pub max_pages: usize,
    pub page_sizes: Vec<usize>,
    pub default_workers: usize,
    pub max_workers: usize,
    /// Pause before each probe request
    pub probe_delay: Duration,
    pub base_max_retries: u32,
    pub probe_max_retries: u32,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_pages: 20,
            page_sizes: vec![50, 100, 200, 300, 500],
            default_workers: 5,
            max_workers: 8,
            probe_delay: Duration::from_millis(200),
            base_max_retries: 3,
            probe_max_retries: 2,
        }
    }
}

/// All candidate probes for `base_url`: page indices first, then sizes.
pub fn plan_probes(base_url: &str, settings: &DiscoverySettings) -> Vec<Probe> {
    let sep = if base_url.contains('?') { '&' } else { '?' };

    let pages = (2..=settings.max_pages).map(|page| Probe {
        kind: ProbeKind::Page,
        value: page,
        url: format!("{base_url}{sep}page={page}"),
    });
    let sizes = settings.page_sizes.iter().map(|&size| Probe {
        kind: ProbeKind::Size,
        value: size,
        url: format!("{base_url}{sep}size={size}"),
    });

    pages.chain(sizes).collect()
}

/// Probe pool size. Only large collections (over 100) scale the pool.
pub fn probe_workers(expected: Option<usize>, settings: &DiscoverySettings) -> usize {
    let workers = match expected {
        Some(n) if n > 100 => settings.max_workers.min(n / 50 + 3),
        _ => settings.default_workers,
    };
    workers.max(1)
}

/// Whether more tours should be looked for after the base page.
pub fn needs_probing(found: usize, expected: Option<usize>) -> bool {
    match expected {
        Some(n) => found < n,
        None => true,
    }
}
