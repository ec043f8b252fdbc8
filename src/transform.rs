use serde::{Deserialize, Serialize};

pub const INPUT_SIZE: u32 = 224;
pub const INPUT_SHAPE: [u32; 3] = [3, INPUT_SIZE, INPUT_SIZE];
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// One step of the per-image read pipeline. Steps are descriptors only; the
/// consumer that decodes pixels applies them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformStep {
    Resize { height: u32, width: u32 },
    RandomHorizontalFlip,
    ColorJitter {
        brightness: f32,
        contrast: f32,
        saturation: f32,
        hue: f32,
    },
    RandomGrayscale,
    ToTensor,
    Normalize { mean: [f32; 3], std: [f32; 3] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessing {
    pub steps: Vec<TransformStep>,
}

impl Preprocessing {
    pub fn test() -> Self {
        Self {
            steps: vec![resize(), TransformStep::ToTensor, normalize()],
        }
    }

    /// Training reads add the random augmentations only when `augment` is set.
    pub fn train(augment: bool) -> Self {
        if !augment {
            return Self::test();
        }
        Self {
            steps: vec![
                resize(),
                TransformStep::RandomHorizontalFlip,
                TransformStep::ColorJitter {
                    brightness: 0.3,
                    contrast: 0.3,
                    saturation: 0.3,
                    hue: 0.3,
                },
                TransformStep::RandomGrayscale,
                TransformStep::ToTensor,
                normalize(),
            ],
        }
    }

    pub fn is_deterministic(&self) -> bool {
        !self.steps.iter().any(|step| {
            matches!(
                step,
                TransformStep::RandomHorizontalFlip
                    | TransformStep::ColorJitter { .. }
                    | TransformStep::RandomGrayscale
            )
        })
    }
}

fn resize() -> TransformStep {
    TransformStep::Resize {
        height: INPUT_SIZE,
        width: INPUT_SIZE,
    }
}

fn normalize() -> TransformStep {
    TransformStep::Normalize {
        mean: NORMALIZE_MEAN,
        std: NORMALIZE_STD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_without_augment_matches_test() {
        assert_eq!(Preprocessing::train(false), Preprocessing::test());
        assert!(Preprocessing::test().is_deterministic());
        assert!(!Preprocessing::train(true).is_deterministic());
    }
}
