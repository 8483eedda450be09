//! Provenance scoring for generated content.
//!
//! Every successful unit of work carries a [`ProvenanceWeights`] value that
//! attributes its content to three information sources: the local corpus,
//! the generator's world knowledge, and online research. The weights are a
//! heuristic computed from the enabled source flags and a quality estimate
//! of the local corpus.
//!
//! Scoring steps:
//! 1. No source enabled: all-zero weights.
//! 2. `local_quality = length_weight * min(1, chars / length_norm)
//!    + relevance_weight * (vocabulary hits / vocabulary size)
//!    + structure_weight * min(1, marker hits / structure_norm)`
//! 3. `raw_local = local_base + local_quality_span * local_quality` when local is on.
//! 4. `raw_world = max(world_floor, world_ceiling - chars / world_decay)` with
//!    local on, `world_only` without it.
//! 5. `raw_online = online_with_both` when local and world are both on,
//!    `online_otherwise` when not.
//! 6. Normalize by the sum.
//!
//! All constants live in [`ScoringConfig`] and are tunable defaults.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Tolerance for the sum-to-one invariant.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Domain, business and technology terms matched case-insensitively as substrings.
pub const RELEVANCE_VOCABULARY: [&str; 15] = [
    "artificial intelligence",
    "AI",
    "machine learning",
    "automation",
    "technology",
    "digital",
    "data",
    "analytics",
    "cloud",
    "innovation",
    "strategy",
    "transformation",
    "competitive",
    "market",
    "revenue",
];

/// Heading, emphasis and list markers matched as substrings.
pub const STRUCTURAL_MARKERS: [&str; 8] = ["##", "###", "####", "**", "*", "1.", "2.", "3."];

/// Which information sources a request allows the generator to draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceFlags {
    /// The caller-supplied local corpus.
    pub use_local: bool,
    /// The generator's built-in world knowledge.
    pub use_world: bool,
    /// Online research.
    pub use_online: bool,
}

impl SourceFlags {
    pub fn new(use_local: bool, use_world: bool, use_online: bool) -> Self {
        Self {
            use_local,
            use_world,
            use_online,
        }
    }

    pub fn local_only() -> Self {
        Self::new(true, false, false)
    }

    /// True when at least one source is enabled.
    pub fn any(&self) -> bool {
        self.use_local || self.use_world || self.use_online
    }

    /// Short names of the enabled sources, in fixed order.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::with_capacity(3);
        if self.use_local {
            labels.push("local");
        }
        if self.use_world {
            labels.push("world");
        }
        if self.use_online {
            labels.push("online");
        }
        labels
    }
}

/// Normalized three-way attribution of a result's content.
///
/// Sums to 1.0 whenever a source was enabled; all zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProvenanceWeights {
    pub local: f64,
    pub world: f64,
    pub online: f64,
}

impl ProvenanceWeights {
    /// The undefined-score sentinel.
    pub const ZERO: Self = Self {
        local: 0.0,
        world: 0.0,
        online: 0.0,
    };

    pub fn total(&self) -> f64 {
        self.local + self.world + self.online
    }

    pub fn is_zero(&self) -> bool {
        self.local == 0.0 && self.world == 0.0 && self.online == 0.0
    }

    /// True when the weights sum to one within [`SUM_TOLERANCE`].
    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= SUM_TOLERANCE
    }

    /// Human-readable attribution line used by report renderers.
    pub fn score_line(&self) -> String {
        let total = self.total();
        if total == 0.0 {
            return "Content score: Not yet generated".to_string();
        }
        format!(
            "Content score: {:.0}% local content, {:.0}% world knowledge, {:.0}% online research",
            self.local / total * 100.0,
            self.world / total * 100.0,
            self.online / total * 100.0
        )
    }
}

impl std::fmt::Display for ProvenanceWeights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.score_line())
    }
}

/// Tunable constants for the provenance heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Local weight floor when local content is enabled.
    pub local_base: f64,
    /// Share of the local weight driven by corpus quality.
    pub local_quality_span: f64,
    pub length_weight: f64,
    pub relevance_weight: f64,
    pub structure_weight: f64,
    /// Corpus length (chars) at which the length signal saturates.
    pub length_norm_chars: usize,
    /// Marker count at which the structure signal saturates.
    pub structure_norm: usize,
    /// Corpus length (chars) over which world weight decays from its ceiling.
    pub world_decay_chars: usize,
    pub world_floor: f64,
    pub world_ceiling: f64,
    /// World weight when local content is disabled.
    pub world_only: f64,
    /// Online weight when local and world are both enabled.
    pub online_with_both: f64,
    pub online_otherwise: f64,
    pub relevance_vocabulary: Vec<String>,
    pub structural_markers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            local_base: 0.3,
            local_quality_span: 0.6,
            length_weight: 0.3,
            relevance_weight: 0.4,
            structure_weight: 0.3,
            length_norm_chars: 5000,
            structure_norm: 10,
            world_decay_chars: 10000,
            world_floor: 0.1,
            world_ceiling: 0.5,
            world_only: 0.7,
            online_with_both: 0.1,
            online_otherwise: 0.2,
            relevance_vocabulary: RELEVANCE_VOCABULARY.iter().map(|s| s.to_string()).collect(),
            structural_markers: STRUCTURAL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScoringConfig {
    /// Reject settings that would break the weight invariants.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        let weights = [
            ("local_base", self.local_base),
            ("local_quality_span", self.local_quality_span),
            ("length_weight", self.length_weight),
            ("relevance_weight", self.relevance_weight),
            ("structure_weight", self.structure_weight),
            ("world_floor", self.world_floor),
            ("world_ceiling", self.world_ceiling),
            ("world_only", self.world_only),
            ("online_with_both", self.online_with_both),
            ("online_otherwise", self.online_otherwise),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidSetting(format!(
                    "scoring.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        // An enabled source must never score zero on its own.
        let floors = [
            ("local_base", self.local_base),
            ("world_floor", self.world_floor),
            ("world_only", self.world_only),
            ("online_otherwise", self.online_otherwise),
        ];
        for (name, value) in floors {
            if value <= 0.0 {
                return Err(ConfigurationError::InvalidSetting(format!(
                    "scoring.{} must be greater than zero",
                    name
                )));
            }
        }

        let norms = [
            ("length_norm_chars", self.length_norm_chars),
            ("structure_norm", self.structure_norm),
            ("world_decay_chars", self.world_decay_chars),
        ];
        for (name, value) in norms {
            if value == 0 {
                return Err(ConfigurationError::InvalidSetting(format!(
                    "scoring.{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Breakdown of the local corpus quality estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalQuality {
    pub chars: usize,
    pub relevance_matches: usize,
    pub vocabulary_size: usize,
    pub structural_matches: usize,
    /// Combined score in `[0, 1]`.
    pub score: f64,
}

/// Computes provenance weights from a [`ScoringConfig`].
///
/// Pure: identical inputs always give identical outputs.
#[derive(Debug, Clone)]
pub struct ProvenanceScorer {
    config: ScoringConfig,
    vocabulary: Vec<String>,
}

impl Default for ProvenanceScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl ProvenanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        let vocabulary = config
            .relevance_vocabulary
            .iter()
            .map(|term| term.to_lowercase())
            .collect();
        Self { config, vocabulary }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Estimate how useful the local corpus is as a content source.
    pub fn local_quality(&self, local_corpus: &str) -> LocalQuality {
        let cfg = &self.config;
        let chars = local_corpus.chars().count();
        let lowered = local_corpus.to_lowercase();

        let relevance_matches = self
            .vocabulary
            .iter()
            .filter(|term| lowered.contains(term.as_str()))
            .count();
        let structural_matches = cfg
            .structural_markers
            .iter()
            .filter(|marker| local_corpus.contains(marker.as_str()))
            .count();

        let length_score = (chars as f64 / cfg.length_norm_chars as f64).min(1.0);
        let relevance_score = if self.vocabulary.is_empty() {
            0.0
        } else {
            (relevance_matches as f64 / self.vocabulary.len() as f64).min(1.0)
        };
        let structure_score = (structural_matches as f64 / cfg.structure_norm as f64).min(1.0);

        let score = (cfg.length_weight * length_score
            + cfg.relevance_weight * relevance_score
            + cfg.structure_weight * structure_score)
            .min(1.0);

        LocalQuality {
            chars,
            relevance_matches,
            vocabulary_size: self.vocabulary.len(),
            structural_matches,
            score,
        }
    }

    /// Unnormalized per-source weights.
    pub fn raw_weights(&self, flags: SourceFlags, local_corpus: &str) -> ProvenanceWeights {
        let cfg = &self.config;

        let local = if flags.use_local {
            cfg.local_base + cfg.local_quality_span * self.local_quality(local_corpus).score
        } else {
            0.0
        };

        let world = match (flags.use_world, flags.use_local) {
            (false, _) => 0.0,
            (true, true) => {
                let chars = local_corpus.chars().count() as f64;
                (cfg.world_ceiling - chars / cfg.world_decay_chars as f64).max(cfg.world_floor)
            }
            (true, false) => cfg.world_only,
        };

        let online = match (flags.use_online, flags.use_local && flags.use_world) {
            (false, _) => 0.0,
            (true, true) => cfg.online_with_both,
            (true, false) => cfg.online_otherwise,
        };

        ProvenanceWeights {
            local,
            world,
            online,
        }
    }

    /// Normalized provenance weights for one result.
    pub fn compute(&self, flags: SourceFlags, local_corpus: &str) -> ProvenanceWeights {
        if !flags.any() {
            return ProvenanceWeights::ZERO;
        }

        let raw = self.raw_weights(flags, local_corpus);
        let total = raw.total();
        if total <= 0.0 || !total.is_finite() {
            return ProvenanceWeights::ZERO;
        }

        ProvenanceWeights {
            local: raw.local / total,
            world: raw.world / total,
            online: raw.online / total,
        }
    }
}

/// Score with the default constants.
pub fn compute(
    use_local: bool,
    use_world: bool,
    use_online: bool,
    local_corpus: &str,
) -> ProvenanceWeights {
    static DEFAULT: OnceLock<ProvenanceScorer> = OnceLock::new();
    DEFAULT
        .get_or_init(ProvenanceScorer::default)
        .compute(SourceFlags::new(use_local, use_world, use_online), local_corpus)
}
