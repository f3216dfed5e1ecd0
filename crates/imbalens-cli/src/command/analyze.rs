use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use imbalens_analysis::{
    arff,
    clustering::DEFAULT_SEED,
    dataset::Dataset,
    stream::{
        AnalysisConfig, DEFAULT_MIN_CLUSTER_SIZE, DEFAULT_MIN_MINORITY, DEFAULT_NEIGHBORS,
        StreamAnalysis,
    },
};

use crate::{plot, report::Report, util};

const DEFAULT_PLOT_DIR: &str = "analysis-plots";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    /// Input stream (.arff)
    #[arg(short, long)]
    pub(crate) file: PathBuf,
    /// Number of examples per batch
    #[arg(short, long)]
    pub(crate) block_size: usize,
    /// Index of the minority class in the declared class values
    #[arg(
        short = 'm',
        long,
        required_unless_present = "minority_label",
        conflicts_with = "minority_label"
    )]
    pub(crate) minority_index: Option<usize>,
    /// Name of the minority class
    #[arg(long)]
    pub(crate) minority_label: Option<String>,
    /// Class attribute name [default: `class`, else the last attribute]
    #[arg(long)]
    pub(crate) class_attribute: Option<String>,
    /// Nearest neighbours used to type minority examples
    #[arg(long, default_value_t = DEFAULT_NEIGHBORS)]
    pub(crate) neighbors: usize,
    /// Minority examples a batch needs to be analysed
    #[arg(long, default_value_t = DEFAULT_MIN_MINORITY)]
    pub(crate) min_minority: usize,
    /// Members a minority sub-cluster needs to be counted
    #[arg(long, default_value_t = DEFAULT_MIN_CLUSTER_SIZE)]
    pub(crate) min_cluster_size: usize,
    /// Seed of the clustering tie-breaking noise
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub(crate) seed: u64,
    /// Directory for the SVG charts
    #[arg(long, default_value = DEFAULT_PLOT_DIR)]
    pub(crate) plot_dir: PathBuf,
    /// Skip writing charts
    #[arg(long)]
    pub(crate) no_plots: bool,
    /// Report output file [default: stdout]
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Also write per-batch records as JSON to this file
    #[arg(long)]
    pub(crate) json: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let text = util::read_text_file("ARFF", &arg.file)?;
    let dataset = arff::parse(&text, arg.class_attribute.as_deref())
        .with_context(|| format!("Failed to parse ARFF file: {}", arg.file.display()))?;
    log::info!(
        "loaded {} examples, {} features, classes {:?}",
        dataset.len(),
        dataset.feature_names().len(),
        dataset.class_names()
    );

    let config = build_config(arg, &dataset)?;
    let analysis = StreamAnalysis::run(&dataset, config)
        .with_context(|| format!("Failed to analyse {}", arg.file.display()))?;

    let file_name = arg.file.display().to_string();
    let report = Report {
        file_name: &file_name,
        analysis: &analysis,
    };
    util::Output::from_output_path(arg.output.clone())?.write_text(&report)?;

    if let Some(path) = &arg.json {
        util::Output::save_json(&analysis, Some(path.clone()))?;
        log::info!("batch records written to {}", path.display());
    }

    if !arg.no_plots
        && let Some(paths) = plot::plot_all(&analysis, &arg.plot_dir, &file_stem(&arg.file))?
    {
        log::info!(
            "charts written to {}, {} and {}",
            paths.minority_ratios.display(),
            paths.num_of_clusters.display(),
            paths.minority_type.display()
        );
    }
    Ok(())
}

fn build_config(arg: &AnalyzeArg, dataset: &Dataset) -> anyhow::Result<AnalysisConfig> {
    let minority_index = match (&arg.minority_label, arg.minority_index) {
        (Some(label), _) => {
            let Some(index) = dataset.class_index(label) else {
                bail!(
                    "Unknown minority class label '{label}' (classes: {})",
                    dataset.class_names().join(", ")
                );
            };
            index
        }
        (None, Some(index)) => index,
        (None, None) => bail!("Either --minority-index or --minority-label is required"),
    };

    Ok(AnalysisConfig {
        neighbors: arg.neighbors,
        min_minority: arg.min_minority,
        min_cluster_size: arg.min_cluster_size,
        seed: arg.seed,
        ..AnalysisConfig::new(arg.block_size, minority_index)
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map_or_else(
        || "stream".to_owned(),
        |stem| stem.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use super::*;

    fn write_stream(dir: &Path) -> PathBuf {
        // 3 batches of 20: minority groups in the first two, none in the last
        let mut text = String::from(
            "% toy stream\n@relation toy\n@attribute x numeric\n@attribute y numeric\n\
             @attribute class {neg,pos}\n@data\n",
        );
        for batch in 0..3 {
            for i in 0..20 {
                let minority = batch < 2 && i < 8;
                if minority {
                    writeln!(text, "{},{},pos", 100 + i % 4, 100 + i / 4).unwrap();
                } else {
                    writeln!(text, "{i},0,neg").unwrap();
                }
            }
        }
        let path = dir.join("toy.arff");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn arg(file: PathBuf, dir: &Path) -> AnalyzeArg {
        AnalyzeArg {
            file,
            block_size: 20,
            minority_index: None,
            minority_label: Some("pos".into()),
            class_attribute: None,
            neighbors: DEFAULT_NEIGHBORS,
            min_minority: DEFAULT_MIN_MINORITY,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            seed: DEFAULT_SEED,
            plot_dir: dir.join("plots"),
            no_plots: false,
            output: Some(dir.join("report.txt")),
            json: Some(dir.join("batches.json")),
        }
    }

    #[test]
    fn test_run_writes_report_json_and_plots() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_stream(dir.path());
        run(&arg(file, dir.path())).unwrap();

        let report = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
        assert!(report.contains("BLOCK_SIZE: 20\nmin_index: 1\nTotal number of examples: 60\n"));
        assert!(report.contains("Class 1 ratio:\n0.0 - 0.4\n"));
        assert!(report.contains("Safe ratio:\n1.0 - 1.0\n"));
        assert!(report.contains("\n60 & 3 (1) & "));
        assert!(report.ends_with("plot_xticks:\n[20, 40, 60]\n"));

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("batches.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["batches"].as_array().unwrap().len(), 3);
        assert_eq!(json["batches"][0]["minority_count"], 8);

        assert!(dir.path().join("plots/toy-minority-type.svg").exists());
    }

    #[test]
    fn test_no_plots_skips_plot_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_stream(dir.path());
        let mut arg = arg(file, dir.path());
        arg.no_plots = true;
        run(&arg).unwrap();

        assert!(dir.path().join("report.txt").exists());
        assert!(!dir.path().join("plots").exists());
    }

    #[test]
    fn test_unknown_minority_label() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_stream(dir.path());
        let mut arg = arg(file, dir.path());
        arg.minority_label = Some("missing".into());
        let err = run(&arg).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown minority class label 'missing' (classes: neg, pos)"
        );
    }

    #[test]
    fn test_invalid_block_size_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_stream(dir.path());
        let mut arg = arg(file, dir.path());
        arg.block_size = 0;
        let err = run(&arg).unwrap_err();
        assert!(format!("{err:#}").contains("block size must be positive"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let arg = arg(dir.path().join("nope.arff"), dir.path());
        assert!(run(&arg).is_err());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("data/elec.arff")), "elec");
        assert_eq!(file_stem(Path::new("/")), "stream");
    }
}
