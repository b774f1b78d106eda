//! Candidate profile documents for fit scoring.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use jobscout_common::ScoutError;

#[derive(Debug, Clone)]
pub struct ProfileDocuments {
    pub resume_text: String,
    pub preferences_text: String,
}

/// Load the resume and preferences once per process. The resume is required;
/// preferences fall back to empty with a warning, since scoring still works
/// on the resume alone.
pub fn load_profile(resume_path: &Path, preferences_path: &Path) -> Result<ProfileDocuments, ScoutError> {
    let resume_text = fs::read_to_string(resume_path)
        .map_err(|_| ScoutError::DocumentNotFound(resume_path.display().to_string()))?;
    if resume_text.trim().is_empty() {
        return Err(ScoutError::DocumentNotFound(format!(
            "{} is empty",
            resume_path.display()
        )));
    }

    let preferences_text = match fs::read_to_string(preferences_path) {
        Ok(text) => text,
        Err(_) => {
            warn!(
                path = %preferences_path.display(),
                "Preferences file missing; scoring on resume only"
            );
            String::new()
        }
    };

    info!(
        resume_bytes = resume_text.len(),
        preferences_bytes = preferences_text.len(),
        "Profile documents loaded"
    );

    Ok(ProfileDocuments {
        resume_text,
        preferences_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_resume_is_document_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_profile(&dir.path().join("resume.txt"), &dir.path().join("prefs.txt"))
            .unwrap_err();
        assert!(matches!(err, ScoutError::DocumentNotFound(_)));
    }

    #[test]
    fn missing_preferences_fall_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let resume_path = dir.path().join("resume.txt");
        let mut file = fs::File::create(&resume_path).unwrap();
        writeln!(file, "Ten years of herding distributed systems.").unwrap();

        let profile = load_profile(&resume_path, &dir.path().join("prefs.txt")).unwrap();
        assert!(profile.resume_text.contains("distributed"));
        assert!(profile.preferences_text.is_empty());
    }
}
