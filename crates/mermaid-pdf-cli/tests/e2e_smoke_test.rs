use std::{fs, path::PathBuf};

use tempfile::tempdir;

use mermaid_pdf::MermaidPdfError;
use mermaid_pdf_cli::{Args, Command, ConvertArgs, run};

fn samples_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("samples")
}

/// Collects all .mmd and .md files from a directory
fn collect_diagram_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && matches!(
                            path.extension().and_then(|s| s.to_str()),
                            Some("mmd" | "md")
                        )
                })
                .collect()
        })
        .unwrap_or_default();

    // Sort for consistent test output
    files.sort();
    files
}

fn convert_args(input: PathBuf, output: PathBuf) -> Args {
    Args {
        command: Command::Convert(ConvertArgs {
            input,
            output: Some(output),
            backend: None,
            renderer: None,
            normalized_svg: None,
        }),
        config: None,
        log_level: "off".to_string(),
    }
}

#[tokio::test]
async fn e2e_smoke_test_valid_samples() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let samples = collect_diagram_files(samples_dir());
    assert!(!samples.is_empty(), "No samples found in samples/");

    let mut failed = Vec::new();

    for sample in &samples {
        let output = temp_dir
            .path()
            .join(format!("{}.pdf", sample.file_stem().unwrap().to_string_lossy()));
        let args = convert_args(sample.clone(), output.clone());

        match run(&args).await {
            Ok(()) => {
                let bytes = fs::read(&output).unwrap_or_default();
                if !bytes.starts_with(b"%PDF") {
                    failed.push(format!("{}: output is not a PDF", sample.display()));
                }
            }
            Err(err) => failed.push(format!("{}: {err}", sample.display())),
        }
    }

    assert!(
        failed.is_empty(),
        "Failed to convert {} of {} samples:\n{}",
        failed.len(),
        samples.len(),
        failed.join("\n")
    );
}

#[tokio::test]
async fn e2e_smoke_test_normalized_svg() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let svg_path = temp_dir.path().join("flowchart.svg");

    let args = Args {
        command: Command::Convert(ConvertArgs {
            input: samples_dir().join("flowchart.mmd"),
            output: Some(temp_dir.path().join("flowchart.pdf")),
            backend: None,
            renderer: None,
            normalized_svg: Some(svg_path.clone()),
        }),
        config: None,
        log_level: "off".to_string(),
    };
    run(&args).await.unwrap();

    let svg = fs::read_to_string(&svg_path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(!svg.contains("<foreignObject"));
}

#[tokio::test]
async fn e2e_smoke_test_error_samples() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let errors = samples_dir().join("errors");

    let err = run(&convert_args(
        errors.join("empty.mmd"),
        temp_dir.path().join("empty.pdf"),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, MermaidPdfError::MissingInput));

    let err = run(&convert_args(
        errors.join("diagram.txt"),
        temp_dir.path().join("diagram.pdf"),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, MermaidPdfError::UnsupportedFile(name) if name == "diagram.txt"));

    // Nothing is written for rejected inputs
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn e2e_smoke_test_missing_input_file() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let err = run(&convert_args(
        temp_dir.path().join("absent.mmd"),
        temp_dir.path().join("absent.pdf"),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, MermaidPdfError::Io(_)));
}
