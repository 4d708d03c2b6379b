//! Detection results files and the evaluation hook.

use crate::{common::*, config::EvaluatorConfig, error::RoidbError, image_set::ImageIndex};
use std::process::Command;
use uuid::Uuid;

/// A scored detection in 0-based TLBR pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub rect: TLBR<f64>,
    pub score: f64,
}

/// Creates a competition id, randomized when `use_salt` is set so that
/// concurrent evaluations do not overwrite each other's files.
pub fn comp_id(use_salt: bool) -> String {
    if use_salt {
        format!("comp4_{}", Uuid::new_v4())
    } else {
        "comp4".into()
    }
}

/// Writes per-class detection results files.
#[derive(Debug, Clone)]
pub struct ResultsWriter<'a> {
    pub dir: &'a Path,
    pub comp_id: &'a str,
    pub image_set: &'a str,
}

impl<'a> ResultsWriter<'a> {
    pub fn path_of(&self, class: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_det_{}_{}.txt",
            self.comp_id, self.image_set, class
        ))
    }

    /// Writes one file per object class. `all_boxes[class][image]` lists the
    /// detections of a class in an image, both in index order. Returns the
    /// written paths.
    pub fn write(
        &self,
        classes: &ClassVocabulary,
        image_index: &ImageIndex,
        all_boxes: &[Vec<Vec<Detection>>],
    ) -> Result<Vec<PathBuf>> {
        if all_boxes.len() != classes.len() {
            return Err(RoidbError::RecordCount {
                expected: classes.len(),
                found: all_boxes.len(),
            })
            .context("detections must be given for every class");
        }

        fs::create_dir_all(self.dir)
            .with_context(|| format!("failed to create directory '{}'", self.dir.display()))?;

        classes
            .object_classes()
            .map(|(class_index, class)| -> Result<PathBuf> {
                let per_image = &all_boxes[class_index];
                if per_image.len() != image_index.len() {
                    return Err(RoidbError::RecordCount {
                        expected: image_index.len(),
                        found: per_image.len(),
                    })
                    .with_context(|| format!("invalid detections of class '{}'", class));
                }

                let path = self.path_of(class);
                debug!("writing {} results file '{}'", class, path.display());
                write_class_file(&path, image_index, per_image)
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
                Ok(path)
            })
            .try_collect()
    }
}

fn write_class_file(
    path: &Path,
    image_index: &ImageIndex,
    per_image: &[Vec<Detection>],
) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);

    for (id, detections) in image_index.iter().zip(per_image) {
        for detection in detections {
            let [x1, y1, x2, y2] = bbox::to_one_based(&detection.rect.corners(CornerOrder::Ltrb))?;
            writeln!(
                writer,
                "{} {:.3} {:.1} {:.1} {:.1} {:.1}",
                id, detection.score, x1, y1, x2, y2
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// The inputs of one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationRequest<'a> {
    pub results_dir: &'a Path,
    pub comp_id: &'a str,
    pub image_set: &'a str,
    pub output_dir: &'a Path,
}

/// Scores written results files.
pub trait DetectionEvaluator {
    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<f64>;
}

/// Runs an external program with the results directory, comp id, image set
/// and output directory appended to its arguments. The last non-empty line
/// of its standard output is the score.
#[derive(Debug, Clone)]
pub struct ExternalEvaluator {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl From<&EvaluatorConfig> for ExternalEvaluator {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }
}

impl DetectionEvaluator for ExternalEvaluator {
    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<f64> {
        let EvaluationRequest {
            results_dir,
            comp_id,
            image_set,
            output_dir,
        } = *request;

        info!("running evaluator '{}'", self.program.display());
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(results_dir)
            .arg(comp_id)
            .arg(image_set)
            .arg(output_dir)
            .output()
            .with_context(|| format!("failed to run '{}'", self.program.display()))?;

        ensure!(
            output.status.success(),
            "evaluator '{}' failed with {}: {}",
            self.program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        let last_line = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .ok_or_else(|| format_err!("evaluator '{}' printed nothing", self.program.display()))?;
        let score: f64 = last_line
            .parse()
            .with_context(|| format!("'{}' is not a score", last_line))?;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn detection(tlbr: [f64; 4], score: f64) -> Detection {
        Detection {
            rect: TLBR::try_from_tlbr(tlbr).unwrap(),
            score,
        }
    }

    #[test]
    fn salted_comp_id() {
        assert_eq!(comp_id(false), "comp4");
        let salted = comp_id(true);
        assert!(salted.starts_with("comp4_"));
        assert_ne!(salted, comp_id(true));
    }

    #[test]
    fn write_results_lines() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let classes = ClassVocabulary::with_background(["bed", "chair"])?;
        let index = ImageIndex::new(["img_0001", "img_0002"])?;
        let all_boxes = vec![
            vec![vec![], vec![]],
            vec![vec![detection([9.0, 19.0, 49.0, 59.0], 0.91234)], vec![]],
            vec![
                vec![],
                vec![
                    detection([0.0, 0.0, 1.0, 1.0], 0.5),
                    detection([2.5, 3.0, 4.0, 5.0], 0.25),
                ],
            ],
        ];

        let writer = ResultsWriter {
            dir: dir.path(),
            comp_id: "comp4",
            image_set: "test",
        };
        let paths = writer.write(&classes, &index, &all_boxes)?;
        assert_eq!(
            paths,
            vec![
                dir.path().join("comp4_det_test_bed.txt"),
                dir.path().join("comp4_det_test_chair.txt"),
            ]
        );

        let bed = fs::read_to_string(&paths[0])?;
        assert_eq!(bed, "img_0001 0.912 20.0 10.0 60.0 50.0\n");

        let chair = fs::read_to_string(&paths[1])?;
        assert_eq!(
            chair,
            "img_0002 0.500 1.0 1.0 2.0 2.0\nimg_0002 0.250 4.0 3.5 6.0 5.0\n"
        );
        Ok(())
    }

    #[test]
    fn reject_misshaped_detections() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let classes = ClassVocabulary::with_background(["bed"])?;
        let index = ImageIndex::new(["img_0001"])?;
        let writer = ResultsWriter {
            dir: dir.path(),
            comp_id: "comp4",
            image_set: "test",
        };

        assert!(writer.write(&classes, &index, &[vec![vec![]]]).is_err());
        assert!(writer
            .write(&classes, &index, &[vec![vec![]], vec![vec![], vec![]]])
            .is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn external_evaluator_score() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let evaluator = ExternalEvaluator {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                r#"test "$2" = comp4 && test "$3" = test && echo "AP for bed = 0.1" && echo 0.625"#
                    .into(),
                "evaluate".into(),
            ],
        };

        let score = evaluator.evaluate(&EvaluationRequest {
            results_dir: dir.path(),
            comp_id: "comp4",
            image_set: "test",
            output_dir: dir.path(),
        })?;
        assert_abs_diff_eq!(score, 0.625);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failing_evaluator() {
        let evaluator = ExternalEvaluator {
            program: "sh".into(),
            args: vec!["-c".into(), "exit 3".into(), "evaluate".into()],
        };
        let dir = Path::new(".");
        let result = evaluator.evaluate(&EvaluationRequest {
            results_dir: dir,
            comp_id: "comp4",
            image_set: "test",
            output_dir: dir,
        });
        assert!(result.is_err());
    }
}
