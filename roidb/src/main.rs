use anyhow::{format_err, Context, Result};
use bbox::prelude::*;
use prettytable::{cell, row, Table};
use roidb::{export::roidb_to_mat, Config, Nyud2Dataset};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Build and inspect the ROI databases of a NYUD2 split.
struct Args {
    /// configuration file
    #[structopt(long, default_value = "roidb.json5")]
    config_file: PathBuf,
    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Clone, StructOpt)]
enum Cmd {
    /// Build the ground truth and merged databases, reusing cached ones.
    Build,
    /// Print the merged record of an image.
    Show {
        /// image identifier, such as img_0001
        image_id: String,
    },
    /// Remove the cached databases of the dataset.
    ClearCache,
    /// Write the merged database to a MAT file.
    ExportMat {
        /// output MAT file
        output_file: PathBuf,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let Args { config_file, cmd } = Args::from_args();
    let config = Config::open(&config_file)?;
    let dataset = Nyud2Dataset::open(config)
        .with_context(|| format!("failed to open dataset of '{}'", config_file.display()))?;

    match cmd {
        Cmd::Build => build(&dataset)?,
        Cmd::Show { image_id } => show(&dataset, &image_id)?,
        Cmd::ClearCache => clear_cache(&dataset)?,
        Cmd::ExportMat { output_file } => export_mat(&dataset, output_file)?,
    }

    Ok(())
}

fn build(dataset: &Nyud2Dataset) -> Result<()> {
    let roidb = dataset.roidb()?;
    let num_boxes: usize = roidb.iter().map(|record| record.num_boxes()).sum();
    println!(
        "{}: {} images, {} boxes",
        dataset.name(),
        roidb.len(),
        num_boxes
    );
    println!("cache: {}", dataset.cache().path_of(&dataset.roidb_key()).display());
    Ok(())
}

fn show(dataset: &Nyud2Dataset, image_id: &str) -> Result<()> {
    let position = dataset
        .image_index()
        .position(image_id)
        .ok_or_else(|| format_err!("image '{}' is not in {}", image_id, dataset.name()))?;
    let roidb = dataset.roidb()?;
    let record = &roidb[position];

    let mut table = Table::new();
    table.add_row(row!["index", "top", "left", "bottom", "right", "class"]);
    record.labels().enumerate().for_each(|(index, label)| {
        let [t, l, b, r] = label.rect.tlbr();
        let class = dataset.classes().name_of(label.class).unwrap_or("?");
        table.add_row(row![index, t, l, b, r, class]);
    });
    table.printstd();

    println!(
        "{} boxes, {} labeled, flipped: {}",
        record.num_boxes(),
        record.gt_overlaps.nnz(),
        record.flipped
    );
    Ok(())
}

fn clear_cache(dataset: &Nyud2Dataset) -> Result<()> {
    let count = dataset.clear_cache()?;
    println!("removed {} cache entries of {}", count, dataset.name());
    Ok(())
}

fn export_mat(dataset: &Nyud2Dataset, output_file: PathBuf) -> Result<()> {
    let roidb = dataset.roidb()?;
    let file = roidb_to_mat(dataset.image_index(), &roidb)?;
    file.write(&output_file)
        .with_context(|| format!("failed to write '{}'", output_file.display()))?;
    println!("wrote {} records to '{}'", roidb.len(), output_file.display());
    Ok(())
}
