use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ResourceSubmission;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomCount {
    pub symptom: String,
    pub reports: usize,
}

/// Submissions that carry a symptom list or a weekly diagnosis summary.
pub fn symptom_reports(submissions: &[ResourceSubmission]) -> Vec<&ResourceSubmission> {
    submissions
        .iter()
        .filter(|submission| {
            !submission.common_symptoms.is_empty()
                || submission
                    .weekly_diagnosis_summary
                    .as_deref()
                    .is_some_and(|summary| !summary.trim().is_empty())
        })
        .collect()
}

/// How many submissions mention each symptom, most frequent first.
pub fn symptom_frequencies(submissions: &[ResourceSubmission]) -> Vec<SymptomCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for submission in submissions {
        let mut seen: Vec<String> = Vec::new();
        for symptom in &submission.common_symptoms {
            let normalized = symptom.trim().to_lowercase();
            if normalized.is_empty() || seen.contains(&normalized) {
                continue;
            }
            seen.push(normalized.clone());
            *counts.entry(normalized).or_default() += 1;
        }
    }

    let mut ranked: Vec<SymptomCount> = counts
        .into_iter()
        .map(|(symptom, reports)| SymptomCount { symptom, reports })
        .collect();
    ranked.sort_by(|a, b| b.reports.cmp(&a.reports).then_with(|| a.symptom.cmp(&b.symptom)));
    ranked
}
