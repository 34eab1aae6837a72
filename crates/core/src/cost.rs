//! Token and cost estimation.
//!
//! Everything here is pure arithmetic over fixed profiles. Token counts are
//! integers, per-unit costs are rounded to 6 places and aggregate costs to 4.

use serde::{Deserialize, Serialize};

/// Multiplier applied to whitespace-separated words to approximate tokens.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Approximate token count for a piece of text: `round(words * 1.3)`.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD).round() as u64
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Per-1k-token prices for one model family, plus an optional per-image surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingProfile {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    #[serde(default)]
    pub image_per_image: f64,
}

impl PricingProfile {
    /// Cost of one call: `(in/1000)*in_price + (out/1000)*out_price`, 6 places.
    pub fn call_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1000.0) * self.input_per_1k;
        let output_cost = (output_tokens as f64 / 1000.0) * self.output_per_1k;
        round_to(input_cost + output_cost, 6)
    }
}

/// Assumed tokens spent on one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProfile {
    pub input: u64,
    pub output: u64,
}

/// Token counts of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenTotals {
    fn new(input: u64, output: u64) -> Self {
        Self {
            input,
            output,
            total: input + output,
        }
    }
}

/// Cost split of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub image_cost: f64,
    pub total_cost: f64,
}

/// Projected cost of checking one file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub slide_count: usize,
    pub has_images: bool,
    pub tokens: TokenTotals,
    pub cost_breakdown: CostBreakdown,
    pub cost_per_slide: f64,
}

/// A file to include in a batch estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(default = "unknown_filename")]
    pub filename: String,
    #[serde(default = "default_slide_count")]
    pub slide_count: usize,
    #[serde(default = "default_has_images")]
    pub has_images: bool,
}

fn unknown_filename() -> String {
    "Unknown".to_string()
}

fn default_slide_count() -> usize {
    20
}

fn default_has_images() -> bool {
    true
}

impl FileDescriptor {
    pub fn new(filename: impl Into<String>, slide_count: usize, has_images: bool) -> Self {
        Self {
            filename: filename.into(),
            slide_count,
            has_images,
        }
    }
}

/// One file's line in a batch estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEstimate {
    pub filename: String,
    pub estimate: CostEstimate,
}

/// Aggregate estimate over several files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEstimate {
    pub file_count: usize,
    pub total_slides: usize,
    pub total_tokens: TokenTotals,
    pub total_cost: f64,
    pub average_cost_per_file: f64,
    pub average_cost_per_slide: f64,
    pub file_estimates: Vec<FileEstimate>,
}

/// Cost at a fixed volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProjection {
    pub volume: u64,
    pub cost: f64,
}

/// A named monthly usage tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageTierProjection {
    pub tier: String,
    pub description: String,
    pub files_per_month: u64,
    pub cost: f64,
}

/// Linear extrapolations of average costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProjections {
    pub by_files: Vec<VolumeProjection>,
    pub by_slides: Vec<VolumeProjection>,
    pub monthly: Vec<UsageTierProjection>,
}

/// File volumes used for projections.
pub const FILE_TIERS: [u64; 5] = [10, 50, 100, 500, 1000];

/// Slide volumes used for projections.
pub const SLIDE_TIERS: [u64; 5] = [100, 500, 1000, 5000, 10000];

/// Named monthly tiers: (name, description, files per month).
pub const USAGE_TIERS: [(&str, &str, u64); 4] = [
    ("light", "10 files/month (200 slides)", 10),
    ("moderate", "50 files/month (1000 slides)", 50),
    ("heavy", "200 files/month (4000 slides)", 200),
    ("enterprise", "1000 files/month (20000 slides)", 1000),
];

/// Pricing and per-slide token assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Pricing for text-only checks.
    pub text_pricing: PricingProfile,
    /// Pricing for checks that send a slide image.
    pub vision_pricing: PricingProfile,
    pub text_only_tokens: TokenProfile,
    pub with_image_tokens: TokenProfile,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            text_pricing: PricingProfile {
                input_per_1k: 0.00025,
                output_per_1k: 0.0005,
                image_per_image: 0.0,
            },
            vision_pricing: PricingProfile {
                input_per_1k: 0.00025,
                output_per_1k: 0.0005,
                image_per_image: 0.0025,
            },
            text_only_tokens: TokenProfile {
                input: 300,
                output: 150,
            },
            with_image_tokens: TokenProfile {
                input: 500,
                output: 200,
            },
        }
    }
}

impl CostModel {
    /// Create a cost model with the default profiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate the cost of checking one file of `slide_count` slides.
    pub fn estimate_single_file(&self, slide_count: usize, has_images: bool) -> CostEstimate {
        let (tokens, pricing) = if has_images {
            (self.with_image_tokens, self.vision_pricing)
        } else {
            (self.text_only_tokens, self.text_pricing)
        };

        let slides = slide_count as u64;
        let input_tokens = slides * tokens.input;
        let output_tokens = slides * tokens.output;

        let input_cost = (input_tokens as f64 / 1000.0) * pricing.input_per_1k;
        let output_cost = (output_tokens as f64 / 1000.0) * pricing.output_per_1k;
        let image_cost = if has_images {
            slide_count as f64 * pricing.image_per_image
        } else {
            0.0
        };
        let total_cost = input_cost + output_cost + image_cost;

        let cost_per_slide = if slide_count > 0 {
            round_to(total_cost / slide_count as f64, 6)
        } else {
            0.0
        };

        CostEstimate {
            slide_count,
            has_images,
            tokens: TokenTotals::new(input_tokens, output_tokens),
            cost_breakdown: CostBreakdown {
                input_cost: round_to(input_cost, 6),
                output_cost: round_to(output_cost, 6),
                image_cost: round_to(image_cost, 6),
                total_cost: round_to(total_cost, 6),
            },
            cost_per_slide,
        }
    }

    /// Sum per-file estimates and derive averages.
    pub fn estimate_batch(&self, files: &[FileDescriptor]) -> BatchEstimate {
        let mut total_slides = 0;
        let mut total_cost = 0.0;
        let mut input_tokens = 0;
        let mut output_tokens = 0;
        let mut file_estimates = Vec::with_capacity(files.len());

        for file in files {
            let estimate = self.estimate_single_file(file.slide_count, file.has_images);
            total_slides += estimate.slide_count;
            total_cost += estimate.cost_breakdown.total_cost;
            input_tokens += estimate.tokens.input;
            output_tokens += estimate.tokens.output;
            file_estimates.push(FileEstimate {
                filename: file.filename.clone(),
                estimate,
            });
        }

        let average_cost_per_file = if files.is_empty() {
            0.0
        } else {
            round_to(total_cost / files.len() as f64, 4)
        };
        let average_cost_per_slide = if total_slides > 0 {
            round_to(total_cost / total_slides as f64, 6)
        } else {
            0.0
        };

        BatchEstimate {
            file_count: files.len(),
            total_slides,
            total_tokens: TokenTotals::new(input_tokens, output_tokens),
            total_cost: round_to(total_cost, 4),
            average_cost_per_file,
            average_cost_per_slide,
            file_estimates,
        }
    }

    /// Extrapolate average costs over the fixed volume and usage tiers.
    pub fn project_costs(&self, base: &BatchEstimate) -> CostProjections {
        project_averages(base.average_cost_per_file, base.average_cost_per_slide)
    }
}

/// Projections from raw per-file and per-slide averages.
pub fn project_averages(cost_per_file: f64, cost_per_slide: f64) -> CostProjections {
    let by_files = FILE_TIERS
        .iter()
        .map(|&volume| VolumeProjection {
            volume,
            cost: round_to(cost_per_file * volume as f64, 4),
        })
        .collect();

    let by_slides = SLIDE_TIERS
        .iter()
        .map(|&volume| VolumeProjection {
            volume,
            cost: round_to(cost_per_slide * volume as f64, 4),
        })
        .collect();

    let monthly = USAGE_TIERS
        .iter()
        .map(|&(tier, description, files)| UsageTierProjection {
            tier: tier.to_string(),
            description: description.to_string(),
            files_per_month: files,
            cost: round_to(cost_per_file * files as f64, 4),
        })
        .collect();

    CostProjections {
        by_files,
        by_slides,
        monthly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("one"), 1);
        // 3 * 1.3 = 3.9
        assert_eq!(estimate_tokens("one two three"), 4);
        // 10 * 1.3 = 13
        assert_eq!(estimate_tokens("a b c d e f g h i j"), 13);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.1234567, 6), 0.123457);
        assert_eq!(round_to(0.12346, 4), 0.1235);
        assert_eq!(round_to(2.0, 4), 2.0);
    }

    #[test]
    fn test_call_cost() {
        let pricing = CostModel::default().text_pricing;
        // 2000/1000*0.00025 + 1000/1000*0.0005 = 0.001
        assert_eq!(pricing.call_cost(2000, 1000), 0.001);
        assert_eq!(pricing.call_cost(0, 0), 0.0);
    }

    #[test]
    fn test_single_file_with_images_exact_total() {
        let model = CostModel::default();
        let estimate = model.estimate_single_file(25, true);

        let expected =
            round_to((25.0 * 500.0 / 1000.0 * 0.00025) + (25.0 * 200.0 / 1000.0 * 0.0005) + (25.0 * 0.0025), 6);
        assert_eq!(estimate.cost_breakdown.total_cost, expected);
        assert_eq!(estimate.cost_breakdown.total_cost, 0.068125);
        assert_eq!(estimate.cost_breakdown.input_cost, 0.003125);
        assert_eq!(estimate.cost_breakdown.output_cost, 0.0025);
        assert_eq!(estimate.cost_breakdown.image_cost, 0.0625);
        assert_eq!(estimate.tokens.input, 12500);
        assert_eq!(estimate.tokens.output, 5000);
        assert_eq!(estimate.tokens.total, 17500);
        assert_eq!(estimate.cost_per_slide, 0.002725);
    }

    #[test]
    fn test_single_file_text_only() {
        let model = CostModel::default();
        let estimate = model.estimate_single_file(20, false);

        assert_eq!(estimate.tokens.input, 6000);
        assert_eq!(estimate.tokens.output, 3000);
        assert_eq!(estimate.cost_breakdown.image_cost, 0.0);
        // 6*0.00025 + 3*0.0005 = 0.003
        assert_eq!(estimate.cost_breakdown.total_cost, 0.003);
    }

    #[test]
    fn test_single_file_zero_slides() {
        let estimate = CostModel::default().estimate_single_file(0, true);
        assert_eq!(estimate.cost_breakdown.total_cost, 0.0);
        assert_eq!(estimate.cost_per_slide, 0.0);
    }

    #[test]
    fn test_batch_estimate() {
        let model = CostModel::default();
        let files = vec![
            FileDescriptor::new("file1.pptx", 25, true),
            FileDescriptor::new("file2.pdf", 10, false),
        ];
        let batch = model.estimate_batch(&files);

        assert_eq!(batch.file_count, 2);
        assert_eq!(batch.total_slides, 35);
        assert_eq!(batch.file_estimates.len(), 2);
        assert_eq!(batch.file_estimates[1].filename, "file2.pdf");
        assert_eq!(batch.total_tokens.input, 12500 + 3000);
        // 0.068125 + 0.0015 = 0.069625
        assert_eq!(batch.total_cost, 0.0696);
        assert_eq!(batch.average_cost_per_file, 0.0348);
        assert_eq!(batch.average_cost_per_slide, 0.001989);
    }

    #[test]
    fn test_batch_estimate_empty() {
        let batch = CostModel::default().estimate_batch(&[]);
        assert_eq!(batch.file_count, 0);
        assert_eq!(batch.total_cost, 0.0);
        assert_eq!(batch.average_cost_per_file, 0.0);
        assert_eq!(batch.average_cost_per_slide, 0.0);
    }

    #[test]
    fn test_file_descriptor_defaults() {
        let file: FileDescriptor = serde_json::from_str("{}").unwrap();
        assert_eq!(file.filename, "Unknown");
        assert_eq!(file.slide_count, 20);
        assert!(file.has_images);
    }

    #[test]
    fn test_projections_use_fixed_tiers() {
        let model = CostModel::default();
        let batch = model.estimate_batch(&[FileDescriptor::new("a.pptx", 20, false)]);
        let projections = model.project_costs(&batch);

        let volumes: Vec<u64> = projections.by_files.iter().map(|p| p.volume).collect();
        assert_eq!(volumes, vec![10, 50, 100, 500, 1000]);
        let volumes: Vec<u64> = projections.by_slides.iter().map(|p| p.volume).collect();
        assert_eq!(volumes, vec![100, 500, 1000, 5000, 10000]);

        // 0.003 per file, 0.00015 per slide
        assert_eq!(projections.by_files[0].cost, 0.03);
        assert_eq!(projections.by_files[4].cost, 3.0);
        assert_eq!(projections.by_slides[4].cost, 1.5);

        let tiers: Vec<&str> = projections.monthly.iter().map(|t| t.tier.as_str()).collect();
        assert_eq!(tiers, vec!["light", "moderate", "heavy", "enterprise"]);
        assert_eq!(projections.monthly[2].cost, 0.6);
    }
}
