use camino::Utf8PathBuf;

use crate::combination::{
    ClassGroup, CombinationResolver, Combinations, TestCombinations, TrainCombinations,
    TrainPlacement,
};
use crate::domain::{ClassLabel, Layout, Location, VariantCode};
use crate::error::SpawriousError;
use crate::record::DatasetRecord;

/// Images per class in one full-strength placement.
pub const CLASS_TOTAL: usize = 3168;

/// Correlated-location counts of the one-to-one recipe, one per group:
/// 97% and 87% of [`CLASS_TOTAL`], rounded to the nearest image.
pub const ONE_TO_ONE_COUNTS: [usize; 2] = [percent_of_total(97), percent_of_total(87)];

/// Class order of the `group` and `test` location lists.
pub const VARIANT_CLASS_ORDER: [ClassLabel; 4] = [
    ClassLabel::Bulldog,
    ClassLabel::Dachshund,
    ClassLabel::Labrador,
    ClassLabel::Corgi,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    /// Each class tied to one location, topped up from a shared filler.
    OneToOne { filler: &'static str },
    /// Class pairs swap two locations between the groups.
    ManyToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub code: VariantCode,
    pub group: [&'static str; 4],
    pub test: [&'static str; 4],
    pub recipe: Recipe,
    pub layout: Layout,
}

pub const VARIANTS: [Variant; 6] = [
    Variant {
        code: VariantCode::Sc11,
        group: ["desert", "jungle", "dirt", "snow"],
        test: ["dirt", "snow", "desert", "jungle"],
        recipe: Recipe::OneToOne { filler: "beach" },
        layout: Layout::Indexed,
    },
    Variant {
        code: VariantCode::Sc12,
        group: ["mountain", "beach", "dirt", "jungle"],
        test: ["jungle", "dirt", "beach", "snow"],
        recipe: Recipe::OneToOne { filler: "desert" },
        layout: Layout::Indexed,
    },
    Variant {
        code: VariantCode::Sc13,
        group: ["jungle", "mountain", "snow", "desert"],
        test: ["mountain", "snow", "desert", "jungle"],
        recipe: Recipe::OneToOne { filler: "beach" },
        layout: Layout::Indexed,
    },
    Variant {
        code: VariantCode::Sc21,
        group: ["dirt", "jungle", "snow", "beach"],
        test: ["snow", "beach", "dirt", "jungle"],
        recipe: Recipe::ManyToMany,
        layout: Layout::Shared,
    },
    Variant {
        code: VariantCode::Sc22,
        group: ["desert", "mountain", "dirt", "jungle"],
        test: ["dirt", "jungle", "mountain", "desert"],
        recipe: Recipe::ManyToMany,
        layout: Layout::Shared,
    },
    Variant {
        code: VariantCode::Sc23,
        group: ["beach", "snow", "mountain", "desert"],
        test: ["desert", "mountain", "beach", "snow"],
        recipe: Recipe::ManyToMany,
        layout: Layout::Shared,
    },
];

const fn percent_of_total(percent: usize) -> usize {
    (CLASS_TOTAL * percent + 50) / 100
}

pub fn variant(code: VariantCode) -> &'static Variant {
    let row = match code {
        VariantCode::Sc11 => 0,
        VariantCode::Sc12 => 1,
        VariantCode::Sc13 => 2,
        VariantCode::Sc21 => 3,
        VariantCode::Sc22 => 4,
        VariantCode::Sc23 => 5,
    };
    &VARIANTS[row]
}

impl Variant {
    pub fn combinations(&self) -> (TrainCombinations, TestCombinations) {
        match self.recipe {
            Recipe::OneToOne { filler } => one_to_one(&self.group, &self.test, filler),
            Recipe::ManyToMany => many_to_many(&self.group, &self.test),
        }
    }

    pub fn resolver(&self, image_root: Utf8PathBuf, augment: bool) -> CombinationResolver {
        CombinationResolver::new(image_root, self.layout, augment)
    }

    pub fn build(
        &self,
        image_root: Utf8PathBuf,
        augment: bool,
    ) -> Result<DatasetRecord, SpawriousError> {
        let (train, test) = self.combinations();
        self.resolver(image_root, augment).resolve(&train, &test)
    }
}

fn one_to_one(
    group: &[&str; 4],
    test_locations: &[&str; 4],
    filler: &str,
) -> (TrainCombinations, TestCombinations) {
    let mut train = VARIANT_CLASS_ORDER
        .iter()
        .zip(group)
        .map(|(class, location)| {
            ClassGroup::new(
                &[*class],
                ONE_TO_ONE_COUNTS
                    .iter()
                    .map(|count| TrainPlacement::new(*location, *count))
                    .collect(),
            )
        })
        .collect::<Vec<_>>();
    train.push(ClassGroup::new(
        &VARIANT_CLASS_ORDER,
        ONE_TO_ONE_COUNTS
            .iter()
            .map(|count| TrainPlacement::new(filler, CLASS_TOTAL - count))
            .collect(),
    ));

    let test = VARIANT_CLASS_ORDER
        .iter()
        .zip(test_locations)
        .map(|(class, location)| {
            ClassGroup::new(&[*class], vec![Location::from(*location); 2])
        })
        .collect();

    (Combinations::Grouped(train), Combinations::Grouped(test))
}

fn many_to_many(
    group: &[&str; 4],
    test_locations: &[&str; 4],
) -> (TrainCombinations, TestCombinations) {
    // bulldog/dachshund swap group[0..2], labrador/corgi swap group[2..4]
    const PAIRS: [(usize, usize); 4] = [(0, 1), (1, 0), (2, 3), (3, 2)];

    let train = VARIANT_CLASS_ORDER
        .iter()
        .zip(PAIRS)
        .map(|(class, (first, second))| {
            ClassGroup::new(
                &[*class],
                vec![
                    TrainPlacement::new(group[first], CLASS_TOTAL),
                    TrainPlacement::new(group[second], CLASS_TOTAL),
                ],
            )
        })
        .collect();

    let test = VARIANT_CLASS_ORDER
        .iter()
        .zip(PAIRS)
        .map(|(class, (first, second))| {
            ClassGroup::new(
                &[*class],
                vec![
                    Location::from(test_locations[first]),
                    Location::from(test_locations[second]),
                ],
            )
        })
        .collect();

    (Combinations::Grouped(train), Combinations::Grouped(test))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_to_one_counts_and_filler() {
        assert_eq!(ONE_TO_ONE_COUNTS, [3073, 2756]);
        let (train, test) = variant(VariantCode::Sc11).combinations();

        let Combinations::Grouped(train) = train else {
            panic!("expected grouped training combinations");
        };
        assert_eq!(train.len(), 5);
        assert_eq!(train[0].classes, vec![ClassLabel::Bulldog]);
        assert_eq!(
            train[0].placements,
            vec![
                TrainPlacement::new("desert", 3073),
                TrainPlacement::new("desert", 2756)
            ]
        );
        assert_eq!(train[4].classes.len(), 4);
        assert_eq!(
            train[4].placements,
            vec![
                TrainPlacement::new("beach", 95),
                TrainPlacement::new("beach", 412)
            ]
        );

        let Combinations::Grouped(test) = test else {
            panic!("expected grouped test combinations");
        };
        assert_eq!(test[3].classes, vec![ClassLabel::Corgi]);
        assert_eq!(test[3].placements, vec![Location::from("jungle"); 2]);
    }

    #[test]
    fn many_to_many_swaps_partner_locations() {
        let (train, test) = variant(VariantCode::Sc21).combinations();

        let Combinations::Grouped(train) = train else {
            panic!("expected grouped training combinations");
        };
        assert_eq!(train.len(), 4);
        assert_eq!(
            train[1].placements,
            vec![
                TrainPlacement::new("jungle", CLASS_TOTAL),
                TrainPlacement::new("dirt", CLASS_TOTAL)
            ]
        );
        assert_eq!(
            train[3].placements,
            vec![
                TrainPlacement::new("beach", CLASS_TOTAL),
                TrainPlacement::new("snow", CLASS_TOTAL)
            ]
        );

        let Combinations::Grouped(test) = test else {
            panic!("expected grouped test combinations");
        };
        assert_eq!(
            test[0].placements,
            vec![Location::from("snow"), Location::from("beach")]
        );
        assert_eq!(
            test[1].placements,
            vec![Location::from("beach"), Location::from("snow")]
        );
    }

    #[test]
    fn every_code_has_one_row() {
        for row in &VARIANTS {
            assert_eq!(variant(row.code).code, row.code);
        }
        assert_eq!(variant(VariantCode::Sc13).layout, Layout::Indexed);
        assert_eq!(variant(VariantCode::Sc23).layout, Layout::Shared);
    }
}
