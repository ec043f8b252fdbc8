use std::fs;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use spawrious_data::combination::{
    ClassGroup, CombinationResolver, Combinations, TestCombinations, TrainCombinations,
    TrainPlacement,
};
use spawrious_data::domain::{ClassLabel, Layout, Location};
use spawrious_data::error::SpawriousError;

const PER_CLASS: usize = 5;

fn image_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("spawrious224")).unwrap();
    for index in ["0", "1"] {
        for location in ["desert", "jungle", "dirt"] {
            for class in ClassLabel::ALL {
                let dir = root.join(index).join(location).join(class.as_str());
                fs::create_dir_all(dir.as_std_path()).unwrap();
                for image in 0..PER_CLASS {
                    fs::write(dir.join(format!("{image}.png")).as_std_path(), b"img").unwrap();
                }
            }
        }
    }
    (temp, root)
}

fn folder_of<'a>(path: &'a Utf8Path, root: &Utf8Path) -> &'a str {
    path.strip_prefix(root)
        .unwrap()
        .components()
        .next()
        .unwrap()
        .as_str()
}

fn capped_train() -> TrainCombinations {
    Combinations::Grouped(vec![
        ClassGroup::new(
            &[ClassLabel::Bulldog],
            vec![
                TrainPlacement::new("desert", 3),
                TrainPlacement::new("desert", 2),
            ],
        ),
        ClassGroup::new(
            &[ClassLabel::Corgi],
            vec![
                TrainPlacement::new("jungle", 3),
                TrainPlacement::new("jungle", 2),
            ],
        ),
        ClassGroup::new(
            &[ClassLabel::Bulldog, ClassLabel::Corgi],
            vec![
                TrainPlacement::new("dirt", 1),
                TrainPlacement::new("dirt", 4),
            ],
        ),
    ])
}

fn paired_test() -> TestCombinations {
    Combinations::Grouped(vec![
        ClassGroup::new(
            &[ClassLabel::Bulldog],
            vec![Location::from("jungle"), Location::from("dirt")],
        ),
        ClassGroup::new(
            &[ClassLabel::Corgi],
            vec![Location::from("desert"), Location::from("desert")],
        ),
    ])
}

#[test]
fn caps_bound_each_class_per_placement() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root, Layout::Indexed, false);

    let record = resolver.resolve(&capped_train(), &paired_test()).unwrap();

    let groups: Vec<_> = record.train_groups().collect();
    assert_eq!(groups.len(), 2);
    let first = groups[0].class_counts();
    assert_eq!(first[&ClassLabel::Bulldog], 3 + 1);
    assert_eq!(first[&ClassLabel::Corgi], 3 + 1);
    let second = groups[1].class_counts();
    assert_eq!(second[&ClassLabel::Bulldog], 2 + 4);
    assert_eq!(second[&ClassLabel::Corgi], 2 + 4);
    assert!(!first.contains_key(&ClassLabel::Labrador));
}

#[test]
fn placements_stay_in_their_group_index() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root.clone(), Layout::Indexed, true);

    let record = resolver.resolve(&capped_train(), &paired_test()).unwrap();

    for (index, group) in record.train_groups().enumerate() {
        let expected = index.to_string();
        assert!(
            group
                .iter()
                .all(|sample| folder_of(&sample.path, &root) == expected)
        );
    }
    assert!(!record.view(1).unwrap().preprocess().is_deterministic());
    assert!(record.test().unwrap().preprocess().is_deterministic());
}

#[test]
fn test_set_is_flat_concatenation_of_all_columns() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root.clone(), Layout::Indexed, false);

    let record = resolver.resolve(&capped_train(), &paired_test()).unwrap();

    let test = record.test().unwrap();
    assert_eq!(test.name(), "Test");
    let parts = &record.environments[0].parts;
    assert_eq!(parts.len(), 4);
    assert_eq!(
        test.len(),
        parts.iter().map(|part| part.indices.len()).sum::<usize>()
    );
    assert_eq!(test.len(), 4 * PER_CLASS);
    // column 0 first: bulldog/jungle then corgi/desert, both from folder 0
    let first = test.get(0).unwrap();
    assert_eq!(first.label, ClassLabel::Bulldog);
    assert!(first.path.as_str().contains("/0/jungle/bulldog/"));
    let last = test.get(test.len() - 1).unwrap();
    assert!(last.path.as_str().contains("/1/desert/corgi/"));
}

#[test]
fn shared_layout_reads_folder_zero_only() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root.clone(), Layout::Shared, false);

    let record = resolver.resolve(&capped_train(), &paired_test()).unwrap();

    for index in 0..record.len() {
        assert!(
            record
                .view(index)
                .unwrap()
                .iter()
                .all(|sample| folder_of(&sample.path, &root) == "0")
        );
    }
    // desert/corgi appears in both test columns but is scanned once
    assert_eq!(record.folders.len(), 3);
}

#[test]
fn flat_combinations_skip_grouping() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root.clone(), Layout::Indexed, false);
    let train: TrainCombinations =
        Combinations::Flat(vec![Location::from("desert"), Location::from("jungle")]);
    let test: TestCombinations =
        Combinations::Flat(vec![Location::from("dirt"), Location::from("dirt")]);

    let record = resolver.resolve(&train, &test).unwrap();

    assert_eq!(record.len(), 3);
    for group in record.train_groups() {
        assert_eq!(group.len(), 4 * PER_CLASS);
        assert!(
            group
                .iter()
                .all(|sample| folder_of(&sample.path, &root) == "0")
        );
    }
    let test = record.test().unwrap();
    assert_eq!(test.len(), 2 * 4 * PER_CLASS);
    assert!(
        test.get(test.len() - 1)
            .unwrap()
            .path
            .as_str()
            .contains("/1/dirt/")
    );
}

#[test]
fn ragged_groups_are_rejected() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root, Layout::Indexed, false);
    let train: TrainCombinations = Combinations::Grouped(vec![
        ClassGroup::new(
            &[ClassLabel::Bulldog],
            vec![
                TrainPlacement::new("desert", 1),
                TrainPlacement::new("dirt", 1),
            ],
        ),
        ClassGroup::new(&[ClassLabel::Corgi], vec![TrainPlacement::new("jungle", 1)]),
    ]);

    let err = resolver.resolve(&train, &paired_test()).unwrap_err();

    assert_matches!(err, SpawriousError::RaggedGroups { expected: 2, found: 1 });
}

#[test]
fn empty_and_missing_inputs_are_errors() {
    let (_temp, root) = image_root();
    let resolver = CombinationResolver::new(root, Layout::Indexed, false);

    let err = resolver
        .resolve(&Combinations::Grouped(Vec::new()), &paired_test())
        .unwrap_err();
    assert_matches!(err, SpawriousError::EmptyCombination(_));

    let train: TrainCombinations = Combinations::Grouped(vec![ClassGroup::new(
        &[ClassLabel::Bulldog],
        vec![TrainPlacement::new("mountain", 1)],
    )]);
    let err = resolver.resolve(&train, &paired_test()).unwrap_err();
    assert_matches!(err, SpawriousError::PathResolution(_));
}
