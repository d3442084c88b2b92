#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::Value;
    use tempfile::tempdir;

    use crate::config::{ PipelineOptions, RunOptions };
    use crate::errors::AnnotatorError;
    use crate::implementations::dataset::{
        annotate_dataset,
        failures_path,
        load_samples,
        DatasetAssembler,
        SampleOutcome,
    };
    use crate::implementations::pipeline::HallucinationAnnotator;
    use crate::models::claim::{ EvaluatedClaim, EvaluationLabel };
    use crate::models::record::ResultRecord;
    use crate::models::sample::Sample;
    use crate::tests::support::{ correction_description, is_correction_prompt, setup, ScriptedGateway };

    fn record(image: &str, claims: Vec<EvaluatedClaim>) -> ResultRecord {
        ResultRecord {
            image: image.to_string(),
            prompt: "Describe the image.".to_string(),
            initial_response: "Two cats on a red couch.".to_string(),
            initial_annotations: None,
            annotations: String::new(),
            evaluated_claims: claims,
            refined_response: "Two cats on a pink couch.".to_string(),
        }
    }

    /// Gateway that judges every claim a non-hallucination and echoes descriptions back
    fn echo_gateway() -> ScriptedGateway {
        ScriptedGateway::new(
            |prompt| {
                let description = prompt.trim_end().lines().last().unwrap_or_default();
                format!("- [FACT-1] {}", description)
            },
            |prompt| {
                if is_correction_prompt(prompt) {
                    return correction_description(prompt);
                }
                "[EVALUATION 1]: non-hallucination\n[REASON 1]: Visible.".to_string()
            }
        )
    }

    fn samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(format!("image_{}.jpg", i), "Describe.", format!("Sample {} description.", i)))
            .collect()
    }

    #[test]
    fn writes_an_indented_json_array() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("out").join("dataset.json");

        let mut assembler = DatasetAssembler::new();
        assembler.push(
            record("cats.jpg", vec![
                EvaluatedClaim {
                    claim: "The couch is red.".to_string(),
                    evaluation: EvaluationLabel::Hallucination,
                    reason: "The couch is pink.".to_string(),
                },
                EvaluatedClaim {
                    claim: "The cats are sleeping.".to_string(),
                    evaluation: EvaluationLabel::NotFound,
                    reason: String::new(),
                }
            ])
        );
        assembler.write_to(&output).unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        assert!(contents.starts_with("[\n    {\n        \"image\": \"cats.jpg\""));
        assert!(contents.contains("\"qwen_annotations\": \"\""));
        assert!(contents.contains("\"evaluation\": \"Not Found\""));
        assert!(contents.contains("\"evaluation\": \"hallucination\""));
        assert!(!contents.contains("initial_annotations"));
        assert!(!dir.path().join("out").join("dataset.json.tmp").exists());

        let parsed: Vec<ResultRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, assembler.records());
    }

    #[test]
    fn empty_dataset_is_an_empty_array() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");

        let assembler = DatasetAssembler::new();
        assembler.write_to(&output).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "[]");
        assert_eq!(assembler.write_failures(&output).unwrap(), None);
        assert!(!failures_path(&output).exists());
    }

    #[test]
    fn failures_live_next_to_the_dataset() {
        let output = std::path::Path::new("/tmp/run/dataset.json");
        assert_eq!(failures_path(output), std::path::Path::new("/tmp/run/dataset.json.failures.json"));
    }

    #[test]
    fn load_samples_defaults_missing_prompt() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.json");
        fs::write(
            &input,
            r#"[
                {"image": "a.jpg", "prompt": "Describe.", "initial_response": "A dog."},
                {"image": "b.jpg", "initial_response": "A cat."}
            ]"#
        ).unwrap();

        let samples = load_samples(&input).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].prompt, "Describe.");
        assert_eq!(samples[1].prompt, "");
        assert_eq!(samples[1].initial_response, "A cat.");
    }

    #[test]
    fn load_samples_rejects_malformed_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.json");
        fs::write(&input, r#"{"image": "a.jpg"}"#).unwrap();

        assert!(matches!(load_samples(&input), Err(AnnotatorError::DatasetError(_))));
        assert!(matches!(load_samples(&dir.path().join("missing.json")), Err(AnnotatorError::IoError(_))));
    }

    #[tokio::test]
    async fn annotates_every_sample_in_order() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");
        let annotator = HallucinationAnnotator::new(echo_gateway(), PipelineOptions::default());
        let mut seen = Vec::new();

        let (assembler, summary) = annotate_dataset(
            &annotator,
            &samples(3),
            &RunOptions::default(),
            &output,
            |index, outcome| {
                seen.push((index, matches!(outcome, SampleOutcome::Completed(_))));
            }
        ).await.unwrap();

        assert_eq!(seen, vec![(0, true), (1, true), (2, true)]);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.claims, 3);
        assert_eq!(summary.hallucinations, 0);

        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        for (i, entry) in written.iter().enumerate() {
            assert_eq!(entry["image"], format!("image_{}.jpg", i));
            assert_eq!(entry["refined_response"], format!("Sample {} description.", i));
            assert_eq!(entry["evaluated_claims"][0]["claim"], format!("Sample {} description.", i));
        }
        assert_eq!(assembler.len(), 3);
        assert!(!failures_path(&output).exists());
    }

    #[tokio::test]
    async fn failed_sample_is_recorded_and_run_continues() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");
        let gateway = echo_gateway().failing_when("Sample 1 description.");
        let annotator = HallucinationAnnotator::new(gateway, PipelineOptions::default());

        let (assembler, summary) = annotate_dataset(
            &annotator,
            &samples(3),
            &RunOptions::default(),
            &output,
            |_, _| {}
        ).await.unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(assembler.failures().len(), 1);
        assert_eq!(assembler.failures()[0].index, 1);
        assert_eq!(assembler.failures()[0].image, "image_1.jpg");

        let images: Vec<&str> = assembler
            .records()
            .iter()
            .map(|r| r.image.as_str())
            .collect();
        assert_eq!(images, vec!["image_0.jpg", "image_2.jpg"]);

        let markers: Vec<Value> = serde_json
            ::from_str(&fs::read_to_string(failures_path(&output)).unwrap())
            .unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0]["index"], 1);
        assert!(markers[0]["error"].as_str().unwrap().contains("scripted failure"));
    }

    #[tokio::test]
    async fn fail_fast_stops_but_keeps_completed_records() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");
        let gateway = echo_gateway().failing_when("Sample 1 description.");
        let annotator = HallucinationAnnotator::new(gateway, PipelineOptions::default());
        let options = RunOptions { fail_fast: true, ..RunOptions::default() };

        let result = annotate_dataset(&annotator, &samples(3), &options, &output, |_, _| {}).await;

        assert!(matches!(result, Err(AnnotatorError::GatewayError { .. })));
        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0]["image"], "image_0.jpg");
        assert!(failures_path(&output).exists());
    }

    fn records_on_disk(path: &std::path::Path) -> Option<usize> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str::<Vec<Value>>(&contents).ok().map(|records| records.len())
    }

    #[tokio::test]
    async fn checkpoints_leave_a_readable_dataset_mid_run() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");
        let gateway = echo_gateway().failing_when("Sample 2 description.");
        let annotator = HallucinationAnnotator::new(gateway, PipelineOptions::default());
        let options = RunOptions { checkpoint_every: Some(1), fail_fast: true, ..RunOptions::default() };
        let mut on_disk = Vec::new();

        let result = annotate_dataset(&annotator, &samples(3), &options, &output, |index, _| {
            on_disk.push((index, records_on_disk(&output)));
        }).await;

        // Each callback runs before that sample's checkpoint, so it sees the previous one
        assert_eq!(on_disk, vec![(0, None), (1, Some(1))]);
        assert!(matches!(result, Err(AnnotatorError::GatewayError { .. })));
        assert_eq!(records_on_disk(&output), Some(2));
    }

    #[tokio::test]
    async fn without_checkpoints_output_appears_at_the_end() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");
        let annotator = HallucinationAnnotator::new(echo_gateway(), PipelineOptions::default());
        let mut on_disk = Vec::new();

        annotate_dataset(&annotator, &samples(2), &RunOptions::default(), &output, |_, _| {
            on_disk.push(records_on_disk(&output));
        }).await.unwrap();

        assert_eq!(on_disk, vec![None, None]);
        assert_eq!(records_on_disk(&output), Some(2));
    }

    #[tokio::test]
    async fn limit_caps_processed_samples() {
        setup();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dataset.json");
        let annotator = HallucinationAnnotator::new(echo_gateway(), PipelineOptions::default());
        let options = RunOptions { limit: Some(2), checkpoint_every: Some(1), ..RunOptions::default() };

        let (_, summary) = annotate_dataset(&annotator, &samples(5), &options, &output, |_, _| {})
            .await
            .unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(annotator.gateway().text_prompts.lock().unwrap().len(), 2);
        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
    }
}
