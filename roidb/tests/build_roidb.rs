use anyhow::Result;
use bbox::{prelude::*, TLBR};
use cache::CacheError;
use indexmap::IndexMap;
use mat_file::{CellArray, MatFile, MatValue, NumericArray, NumericClass, StructArray};
use roidb::{
    config::{CacheConfig, CacheValidity, Config, DatasetConfig, ProposalConfig, ResultsConfig},
    results::{Detection, DetectionEvaluator, EvaluationRequest},
    Nyud2Dataset, RoiRecord, RoidbError,
};
use std::{
    cell::RefCell,
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// A devkit with the `trainval` split [img_0001, img_0002].
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let fixture = Self { dir };
        let devkit = fixture.devkit();

        fs::create_dir_all(devkit.join("data/images"))?;
        fs::write(devkit.join("data/images/img_0001.png"), b"")?;
        fs::create_dir_all(devkit.join("benchmarkData/metadata"))?;
        fs::create_dir_all(devkit.join("benchmarkData/gt_box_cache_dir"))?;
        fs::create_dir_all(fixture.root().join("mcg_data"))?;

        let mut splits = MatFile::new();
        splits.insert(
            "trainval",
            NumericArray::new(NumericClass::Double, vec![2, 1], vec![1.0, 2.0])?.into(),
        );
        splits.write(devkit.join("benchmarkData/metadata/nyusplits.mat"))?;

        fixture.write_annotation(
            "img_0001",
            &[
                ("chair", [11.0, 21.0, 51.0, 61.0]),
                ("unknown_class", [1.0, 1.0, 2.0, 2.0]),
            ],
        )?;
        fixture.write_annotation("img_0002", &[("bed", [1.0, 1.0, 10.0, 20.0])])?;
        fixture.write_proposals(&[
            ("img_0002", vec![[5.0, 4.0, 7.0, 6.0]]),
            ("img_0001", vec![[1.0, 1.0, 640.0, 480.0], [21.0, 11.0, 61.0, 51.0]]),
        ])?;

        Ok(fixture)
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn devkit(&self) -> PathBuf {
        self.root().join("devkit")
    }

    fn proposal_path(&self) -> PathBuf {
        self.root().join("mcg_data/nyud2_2015.mat")
    }

    fn write_annotation(&self, id: &str, objects: &[(&str, [f64; 4])]) -> Result<()> {
        let objects: Vec<_> = objects
            .iter()
            .map(|(class, bbox)| {
                IndexMap::from([
                    ("class".to_owned(), MatValue::text(class)),
                    ("bbox".to_owned(), MatValue::row_vector(bbox)),
                ])
            })
            .collect();
        let rec = StructArray::row(vec![IndexMap::from([(
            "objects".to_owned(),
            StructArray::row(objects)?.into(),
        )])])?;

        let mut file = MatFile::new();
        file.insert("rec", rec.into());
        file.write(
            self.devkit()
                .join("benchmarkData/gt_box_cache_dir")
                .join(format!("{}.mat", id)),
        )?;
        Ok(())
    }

    fn write_proposals(&self, entries: &[(&str, Vec<[f64; 4]>)]) -> Result<()> {
        self.write_proposals_to(&self.proposal_path(), entries)
    }

    fn write_proposals_to(&self, path: &Path, entries: &[(&str, Vec<[f64; 4]>)]) -> Result<()> {
        let mut names = vec![];
        let mut boxes: Vec<MatValue> = vec![];
        for (name, rows) in entries {
            names.push(MatValue::text(name));
            boxes.push(NumericArray::from_rows(NumericClass::Double, rows.as_slice())?.into());
        }

        let mut file = MatFile::new();
        file.insert("bboxes", CellArray::column(boxes).into());
        file.insert("imnames", CellArray::column(names).into());
        file.write(path)?;
        Ok(())
    }

    fn config(&self) -> Config {
        Config {
            dataset: DatasetConfig {
                devkit_dir: self.devkit(),
                image_set: "trainval".into(),
                year: "2015".into(),
                image_type: "images".into(),
                classes_file: None,
                use_ground_truth: true,
            },
            cache: CacheConfig {
                dir: self.root().join("cache"),
                validity: CacheValidity::PresenceOnly,
            },
            proposals: ProposalConfig::default(),
            results: ResultsConfig {
                dir: Some(self.root().join("results")),
                use_salt: false,
                cleanup: true,
                evaluator: None,
            },
        }
    }
}

#[test]
fn merged_database_starts_with_ground_truth() -> Result<()> {
    let fixture = Fixture::new()?;
    let dataset = Nyud2Dataset::open(fixture.config())?;
    assert_eq!(dataset.name(), "nyud2_images_2015_trainval");
    assert_eq!(dataset.num_classes(), 20);

    let gt_roidb = dataset.gt_roidb()?;
    let roidb = dataset.roidb()?;
    assert_eq!(roidb.len(), 2);

    let chair = dataset.classes().index_of("chair").unwrap();
    assert_eq!(gt_roidb[0].gt_classes, vec![chair]);
    assert_eq!(gt_roidb[0].boxes[0].tlbr(), [10, 20, 50, 60]);

    for (gt, merged) in gt_roidb.iter().zip(&roidb) {
        let num_gt = gt.num_boxes();
        assert_eq!(&merged.boxes[..num_gt], &gt.boxes[..]);
        assert_eq!(&merged.gt_classes[..num_gt], &gt.gt_classes[..]);
        assert_eq!(merged.gt_overlaps.head(num_gt), gt.gt_overlaps);
        assert!(merged.gt_classes[num_gt..].iter().all(|&class| class == 0));
    }

    // proposals follow the image index, not the file order
    let proposals: Vec<_> = roidb[0].boxes[1..].iter().map(|rect| rect.tlbr()).collect();
    assert_eq!(proposals, vec![[0, 0, 479, 639], [10, 20, 50, 60]]);
    let proposals: Vec<_> = roidb[1].boxes[1..].iter().map(|rect| rect.tlbr()).collect();
    assert_eq!(proposals, vec![[3, 4, 5, 6]]);
    assert_eq!(roidb[0].gt_overlaps.shape(), (3, 20));
    assert_eq!(roidb[0].gt_overlaps.nnz(), 1);

    let cache_dir = fixture.root().join("cache");
    assert!(cache_dir
        .join("nyud2_images_2015_trainval_gt_roidb.bincode")
        .is_file());
    assert!(cache_dir
        .join("nyud2_images_2015_trainval_mcg_roidb.bincode")
        .is_file());
    Ok(())
}

#[test]
fn second_build_reuses_the_cache() -> Result<()> {
    let fixture = Fixture::new()?;
    let first = Nyud2Dataset::open(fixture.config())?.roidb()?;

    // presence-only entries survive the removal of their inputs
    fs::remove_file(fixture.proposal_path())?;
    fs::remove_dir_all(fixture.devkit().join("benchmarkData/gt_box_cache_dir"))?;

    let dataset = Nyud2Dataset::open(fixture.config())?;
    assert_eq!(dataset.roidb()?, first);
    assert_eq!(dataset.clear_cache()?, 2);
    assert!(dataset.roidb().is_err());
    Ok(())
}

#[test]
fn content_hash_rebuilds_changed_inputs() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config();
    config.cache.validity = CacheValidity::ContentHash;

    let first = Nyud2Dataset::open(config.clone())?.roidb()?;
    assert_eq!(first[1].num_boxes(), 2);

    fixture.write_annotation(
        "img_0002",
        &[("bed", [1.0, 1.0, 10.0, 20.0]), ("sofa", [2.0, 2.0, 3.0, 3.0])],
    )?;
    let second = Nyud2Dataset::open(config)?.roidb()?;
    assert_eq!(second[0], first[0]);
    assert_eq!(second[1].num_boxes(), 3);
    assert_eq!(second[1].gt_overlaps.nnz(), 2);
    Ok(())
}

#[test]
fn corrupt_cache_is_fatal() -> Result<()> {
    let fixture = Fixture::new()?;
    let dataset = Nyud2Dataset::open(fixture.config())?;
    let path = dataset.cache().path_of(&dataset.gt_key());
    fs::write(&path, b"not a database")?;

    let err = dataset.gt_roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CacheError>(),
        Some(CacheError::Deserialization { .. })
    ));
    Ok(())
}

#[test]
fn cached_database_with_wrong_record_count() -> Result<()> {
    let fixture = Fixture::new()?;
    let dataset = Nyud2Dataset::open(fixture.config())?;
    let records = vec![RoiRecord::from_proposals(vec![], dataset.num_classes())];
    fs::write(
        dataset.cache().path_of(&dataset.gt_key()),
        bincode::serialize(&records)?,
    )?;

    let err = dataset.gt_roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::RecordCount {
            expected: 2,
            found: 1
        })
    ));
    Ok(())
}

#[test]
fn cached_database_with_wrong_class_count() -> Result<()> {
    let fixture = Fixture::new()?;
    let dataset = Nyud2Dataset::open(fixture.config())?;
    let records = vec![RoiRecord::from_proposals(vec![], 5); 2];
    fs::write(
        dataset.cache().path_of(&dataset.roidb_key()),
        bincode::serialize(&records)?,
    )?;

    let err = dataset.roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::ClassCount {
            expected: 20,
            found: 5
        })
    ));
    Ok(())
}

#[test]
fn invalid_cached_record_is_fatal() -> Result<()> {
    let fixture = Fixture::new()?;
    let dataset = Nyud2Dataset::open(fixture.config())?;
    let mut record = RoiRecord::from_proposals(vec![], dataset.num_classes());
    record.gt_classes.push(1);
    fs::write(
        dataset.cache().path_of(&dataset.gt_key()),
        bincode::serialize(&vec![record.clone(), record])?,
    )?;

    let err = dataset.gt_roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CacheError>(),
        Some(CacheError::Deserialization { .. })
    ));
    Ok(())
}

#[test]
fn distinct_configurations_use_distinct_keys() -> Result<()> {
    let fixture = Fixture::new()?;
    let classes_file = fixture.root().join("classes.txt");
    fs::write(&classes_file, "bed\nchair\n")?;

    let default = fixture.config();
    let mut no_gt = fixture.config();
    no_gt.dataset.use_ground_truth = false;
    let mut custom_classes = fixture.config();
    custom_classes.dataset.classes_file = Some(classes_file);
    let mut custom_proposals = fixture.config();
    custom_proposals.proposals.file = Some(fixture.root().join("other.mat"));

    let datasets: Vec<_> = [default, no_gt, custom_classes, custom_proposals]
        .into_iter()
        .map(Nyud2Dataset::open)
        .collect::<Result<_>>()?;

    let roidb_keys: HashSet<_> = datasets
        .iter()
        .map(|dataset| dataset.roidb_key().file_name())
        .collect();
    assert_eq!(roidb_keys.len(), datasets.len());

    let gt_key = |index: usize| datasets[index].gt_key().file_name();
    assert_eq!(gt_key(0), "nyud2_images_2015_trainval_gt_roidb.bincode");
    assert_eq!(gt_key(0), gt_key(1));
    assert_ne!(gt_key(0), gt_key(2));
    assert_eq!(gt_key(0), gt_key(3));
    Ok(())
}

#[test]
fn enabling_ground_truth_rebuilds() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config();
    config.dataset.use_ground_truth = false;
    let proposals_only = Nyud2Dataset::open(config)?.roidb()?;
    assert_eq!(proposals_only[0].num_boxes(), 2);

    let roidb = Nyud2Dataset::open(fixture.config())?.roidb()?;
    assert_eq!(roidb[0].num_boxes(), 3);
    assert_eq!(roidb[0].boxes[0].tlbr(), [10, 20, 50, 60]);
    assert_eq!(roidb[0].gt_overlaps.nnz(), 1);
    Ok(())
}

#[test]
fn switching_proposal_file_rebuilds() -> Result<()> {
    let fixture = Fixture::new()?;
    let first = Nyud2Dataset::open(fixture.config())?.roidb()?;
    assert_eq!(first[1].num_boxes(), 2);

    let other = fixture.root().join("mcg_data/other.mat");
    fixture.write_proposals_to(
        &other,
        &[
            ("img_0001", vec![[1.0, 1.0, 2.0, 2.0]]),
            ("img_0002", vec![[1.0, 1.0, 2.0, 2.0], [1.0, 1.0, 3.0, 3.0]]),
        ],
    )?;
    let mut config = fixture.config();
    config.proposals.file = Some(other);

    let second = Nyud2Dataset::open(config)?.roidb()?;
    assert_eq!(second[0].num_boxes(), 2);
    assert_eq!(second[1].num_boxes(), 3);
    Ok(())
}

#[test]
fn content_hash_reports_removed_annotation() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config();
    config.cache.validity = CacheValidity::ContentHash;
    Nyud2Dataset::open(config.clone())?.roidb()?;

    fs::remove_file(
        fixture
            .devkit()
            .join("benchmarkData/gt_box_cache_dir/img_0002.mat"),
    )?;
    let err = Nyud2Dataset::open(config)?.roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::FileNotFound { .. })
    ));
    Ok(())
}

#[test]
fn missing_annotation_aborts() -> Result<()> {
    let fixture = Fixture::new()?;
    fs::remove_file(
        fixture
            .devkit()
            .join("benchmarkData/gt_box_cache_dir/img_0002.mat"),
    )?;

    let dataset = Nyud2Dataset::open(fixture.config())?;
    let err = dataset.roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::FileNotFound { .. })
    ));
    assert!(!dataset.cache().path_of(&dataset.gt_key()).exists());
    Ok(())
}

#[test]
fn ambiguous_proposals_abort() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.write_proposals(&[
        ("img_0001", vec![[1.0, 1.0, 2.0, 2.0]]),
        ("img_0002", vec![[1.0, 1.0, 2.0, 2.0]]),
        ("img_0002", vec![[1.0, 1.0, 3.0, 3.0]]),
    ])?;

    let dataset = Nyud2Dataset::open(fixture.config())?;
    let err = dataset.roidb().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::Alignment { matches: 2, .. })
    ));
    Ok(())
}

#[test]
fn proposals_only_database() -> Result<()> {
    let fixture = Fixture::new()?;
    fs::remove_dir_all(fixture.devkit().join("benchmarkData/gt_box_cache_dir"))?;
    let mut config = fixture.config();
    config.dataset.use_ground_truth = false;

    let roidb = Nyud2Dataset::open(config)?.roidb()?;
    assert_eq!(roidb[0].num_boxes(), 2);
    assert_eq!(roidb[1].num_boxes(), 1);
    assert!(roidb
        .iter()
        .all(|record| record.gt_overlaps.nnz() == 0 && record.gt_classes.iter().all(|&c| c == 0)));
    Ok(())
}

#[test]
fn startup_checks() -> Result<()> {
    let fixture = Fixture::new()?;

    let mut config = fixture.config();
    config.dataset.devkit_dir = fixture.root().join("missing");
    let err = Nyud2Dataset::open(config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::Configuration(_))
    ));

    let mut config = fixture.config();
    config.dataset.image_set = "test".into();
    assert!(Nyud2Dataset::open(config).is_err());

    let dataset = Nyud2Dataset::open(fixture.config())?;
    assert_eq!(
        dataset.image_path_at(0)?,
        fixture.devkit().join("data/images/img_0001.png")
    );
    let err = dataset.image_path_at(1).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RoidbError>(),
        Some(RoidbError::FileNotFound { .. })
    ));
    assert!(dataset.image_path_at(2).is_err());
    Ok(())
}

#[test]
fn custom_classes_file() -> Result<()> {
    let fixture = Fixture::new()?;
    let classes_file = fixture.root().join("classes.txt");
    fs::write(&classes_file, "bed\nchair\n")?;
    let mut config = fixture.config();
    config.dataset.classes_file = Some(classes_file);

    // a database over the default classes must not be reused
    Nyud2Dataset::open(fixture.config())?.roidb()?;

    let dataset = Nyud2Dataset::open(config)?;
    assert_eq!(dataset.num_classes(), 3);
    let gt_roidb = dataset.gt_roidb()?;
    assert_eq!(gt_roidb[0].num_classes(), 3);
    assert_eq!(gt_roidb[0].gt_classes, vec![2]);
    assert_eq!(gt_roidb[1].gt_classes, vec![1]);
    assert_eq!(dataset.roidb()?[0].gt_overlaps.shape(), (3, 3));
    Ok(())
}

struct RecordingEvaluator {
    seen: RefCell<Vec<String>>,
}

impl DetectionEvaluator for RecordingEvaluator {
    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<f64> {
        let path = request
            .results_dir
            .join(format!("{}_det_{}_chair.txt", request.comp_id, request.image_set));
        self.seen.borrow_mut().push(fs::read_to_string(path)?);
        Ok(0.5)
    }
}

#[test]
fn evaluate_and_clean_up() -> Result<()> {
    let fixture = Fixture::new()?;
    let dataset = Nyud2Dataset::open(fixture.config())?;
    let chair = dataset.classes().index_of("chair").unwrap();

    let mut all_boxes = vec![vec![vec![], vec![]]; dataset.num_classes()];
    all_boxes[chair][0].push(Detection {
        rect: TLBR::try_from_tlbr([10.0, 20.0, 50.0, 60.0])?,
        score: 0.75,
    });

    let evaluator = RecordingEvaluator {
        seen: RefCell::new(vec![]),
    };
    let score = dataset.evaluate_detections(&all_boxes, fixture.root(), &evaluator)?;

    assert_eq!(score, 0.5);
    assert_eq!(
        evaluator.seen.borrow().as_slice(),
        &["img_0001 0.750 21.0 11.0 61.0 51.0\n".to_string()]
    );
    let leftover = fs::read_dir(fixture.root().join("results"))?.count();
    assert_eq!(leftover, 0);
    assert!(dataset.external_evaluator().is_none());
    Ok(())
}
