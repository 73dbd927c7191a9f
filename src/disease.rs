//! Static reference information about the diseases the classifier knows

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseInfo {
    pub description: &'static str,
    pub treatment: &'static str,
    pub severity: &'static str,
}

/// Returned for any label missing from the table
pub static UNKNOWN: DiseaseInfo = DiseaseInfo {
    description: "Unknown disease detected.",
    treatment: "Consult with plant pathologist.",
    severity: "Unknown",
};

/// Keyed by lowercase label
static TABLE: Lazy<HashMap<&'static str, DiseaseInfo>> = Lazy::new(|| {
    HashMap::from([
        (
            "healthy",
            DiseaseInfo {
                description: "The tea leaf appears to be healthy with no visible signs of disease.",
                treatment: "Continue regular care and monitoring.",
                severity: "None",
            },
        ),
        (
            "anthracnose",
            DiseaseInfo {
                description: "A fungal disease causing dark, sunken lesions on leaves.",
                treatment: "Apply fungicide, improve air circulation, remove infected leaves.",
                severity: "Moderate to High",
            },
        ),
        (
            "bird eye spot",
            DiseaseInfo {
                description:
                    "Circular spots with gray centers and dark borders, resembling bird eyes.",
                treatment: "Use copper-based fungicides, ensure proper drainage.",
                severity: "Moderate",
            },
        ),
        (
            "brown blight",
            DiseaseInfo {
                description: "Brown patches on leaves that can spread rapidly.",
                treatment: "Apply appropriate fungicides, remove infected plant parts.",
                severity: "High",
            },
        ),
        (
            "red leaf spot",
            DiseaseInfo {
                description: "Reddish spots on leaf surface, often circular.",
                treatment: "Fungicide application, improve ventilation.",
                severity: "Moderate",
            },
        ),
        (
            "algal leaf",
            DiseaseInfo {
                description: "Green to brown spots caused by algal infection.",
                treatment: "Reduce humidity, apply copper fungicides.",
                severity: "Low to Moderate",
            },
        ),
        (
            "gray light",
            DiseaseInfo {
                description: "Gray discoloration on leaf surface, often due to fungal infection.",
                treatment: "Apply fungicides, improve air circulation and reduce humidity.",
                severity: "Moderate",
            },
        ),
        (
            "white spot",
            DiseaseInfo {
                description: "White spots on leaves, usually caused by fungal pathogens.",
                treatment: "Remove infected leaves, apply appropriate fungicides.",
                severity: "Low to Moderate",
            },
        ),
    ])
});

/// Look up a class label, case-insensitively
pub fn lookup(label: &str) -> &'static DiseaseInfo {
    TABLE.get(label.to_lowercase().as_str()).unwrap_or(&UNKNOWN)
}
