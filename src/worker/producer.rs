use crate::errors::WorkerError;
use crate::model::Task;
use crate::protocol::{DecodedArtifact, encode_artifact};

/// Generates worker output without an external process.
///
/// The returned text goes through the same decode path as process output.
pub trait ContentProducer: Send + Sync {
    fn produce(&self, task: &Task) -> Result<String, WorkerError>;
}

/// Emits one marker-formatted artifact of the task's primary expected type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderProducer;

impl ContentProducer for PlaceholderProducer {
    fn produce(&self, task: &Task) -> Result<String, WorkerError> {
        let Some(artifact_type) = task.primary_output_type() else {
            return Ok(format!(
                "{} has nothing to produce for {}.\n",
                task.assigned_role.display_name(),
                task.stage.display_name()
            ));
        };

        let mut body = format!(
            "# {}\n\nStage: {}\nPrepared by: {}\n",
            artifact_type.display_name(),
            task.stage.display_name(),
            task.assigned_role.display_name()
        );
        if !task.description.trim().is_empty() {
            body.push_str(&format!("\n{}\n", task.description.trim()));
        }
        if !task.input_artifacts.is_empty() {
            body.push_str("\n## Inputs\n");
            for input in &task.input_artifacts {
                body.push_str(&format!("- {} (v{})\n", input.name, input.version));
            }
        }

        let artifact = DecodedArtifact::new(artifact_type, body).with_description(format!(
            "Placeholder {} for {}",
            artifact_type.display_name().to_lowercase(),
            task.stage.display_name()
        ));
        Ok(encode_artifact(&artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactType;
    use crate::protocol::decode_artifacts;
    use crate::role::AgentRole;
    use crate::stage::Stage;

    #[test]
    fn test_placeholder_emits_primary_type() {
        let task = Task::new("f", Stage::TaskBreakdown, AgentRole::EngineeringManager)
            .with_description("Split the work")
            .with_expected_outputs(vec![ArtifactType::TaskList, ArtifactType::Documentation]);

        let text = PlaceholderProducer.produce(&task).unwrap();
        let decoded = decode_artifacts(&text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].artifact_type, ArtifactType::TaskList);
        assert_eq!(decoded[0].name, "Task List");
        assert!(decoded[0].content.contains("Split the work"));
    }

    #[test]
    fn test_placeholder_without_expected_outputs() {
        let task = Task::new("f", Stage::Testing, AgentRole::QaEngineer);
        let text = PlaceholderProducer.produce(&task).unwrap();
        assert!(decode_artifacts(&text).is_empty());
    }
}
