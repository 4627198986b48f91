//! Classifies a raw field map into a record variant and expands its
//! compound fields into typed attributes.

use super::{AttributeId, RawRecord, Record, RecordKind, Value};
use crate::error::Error;

const OSGI_KEYS: &[(&str, AttributeId)] = &[
    ("Bundle-SymbolicName", AttributeId::BundleSymbolicName),
    ("Bundle-Version", AttributeId::BundleVersion),
    ("Export-Package", AttributeId::ExportPackage),
    ("Export-Service", AttributeId::ExportService),
    ("Bundle-Description", AttributeId::BundleDescription),
    ("Bundle-Name", AttributeId::BundleName),
    ("Bundle-License", AttributeId::BundleLicense),
    ("Bundle-DocURL", AttributeId::BundleDocUrl),
    ("Import-Package", AttributeId::ImportPackage),
    ("Require-Bundle", AttributeId::RequireBundle),
    ("Provide-Capability", AttributeId::ProvideCapability),
    ("Require-Capability", AttributeId::RequireCapability),
    ("Fragment-Host", AttributeId::FragmentHost),
    (
        "Bundle-RequiredExecutionEnvironment",
        AttributeId::BundleRequiredExecutionEnvironment,
    ),
    ("sha256", AttributeId::Sha256),
];

/// Classifies a raw field map. The five rules are disjoint and evaluated in
/// order; first match wins.
pub fn classify(raw: &RawRecord) -> RecordKind {
    if raw.contains_key("DESCRIPTOR") {
        RecordKind::Descriptor
    } else if raw.contains_key("allGroups") {
        RecordKind::AllGroups
    } else if raw.contains_key("rootGroups") {
        RecordKind::RootGroups
    } else if raw.contains_key("del") {
        RecordKind::ArtifactRemove
    } else {
        RecordKind::ArtifactAdd
    }
}

/// Classifies and fully expands a raw field map into a typed [Record].
pub fn expand(raw: &RawRecord) -> Result<Record, Error> {
    match classify(raw) {
        RecordKind::Descriptor => Ok(expand_descriptor(raw)),
        RecordKind::AllGroups => Ok(expand_group_list(raw, "allGroupsList", AttributeId::AllGroupsList)),
        RecordKind::RootGroups => Ok(expand_group_list(raw, "rootGroupsList", AttributeId::RootGroupsList)),
        RecordKind::ArtifactRemove => expand_artifact_remove(raw),
        RecordKind::ArtifactAdd => expand_artifact_add(raw),
    }
}

fn expand_descriptor(raw: &RawRecord) -> Record {
    let mut record = Record::new(RecordKind::Descriptor);
    if let Some(idxinfo) = raw.get("IDXINFO") {
        if let Some(repository_id) = idxinfo.split('|').nth(1) {
            record.set(AttributeId::RepositoryId, Value::String(repository_id.to_string()));
        }
    }
    record
}

fn expand_group_list(raw: &RawRecord, raw_key: &str, attribute: AttributeId) -> Record {
    let kind = if attribute == AttributeId::AllGroupsList {
        RecordKind::AllGroups
    } else {
        RecordKind::RootGroups
    };
    let mut record = Record::new(kind);

    let groups: Vec<String> = raw
        .get(raw_key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.split('|').map(str::to_string).collect())
        .unwrap_or_default();

    record.set(attribute, Value::List(groups));
    record
}

fn expand_artifact_remove(raw: &RawRecord) -> Result<Record, Error> {
    let mut record = Record::new(RecordKind::ArtifactRemove);
    apply_record_modified(raw, &mut record);

    if let Some(del) = raw.get("del") {
        expand_uinfo(&mut record, del);
    }

    Ok(record)
}

fn expand_artifact_add(raw: &RawRecord) -> Result<Record, Error> {
    let mut record = Record::new(RecordKind::ArtifactAdd);

    if let Some(u) = raw.get("u") {
        let patched = patch_writer_bug(u, raw.get("i").map(String::as_str));
        expand_uinfo(&mut record, &patched);
    }

    if let Some(i) = raw.get("i") {
        if !i.trim().is_empty() {
            expand_i_tuple(&mut record, i)?;
        }
    }

    apply_record_modified(raw, &mut record);

    copy_if_present(raw, "n", AttributeId::Name, &mut record);
    copy_if_present(raw, "d", AttributeId::Description, &mut record);
    copy_if_present(raw, "1", AttributeId::Sha1, &mut record);
    copy_if_present(raw, "px", AttributeId::PluginPrefix, &mut record);
    copy_if_present(raw, "gx", AttributeId::PluginGoals, &mut record);

    if let Some(classnames) = raw.get("classnames") {
        let items: Vec<String> = classnames.split('|').map(str::to_string).collect();
        record.set(AttributeId::Classnames, Value::List(items));
    }

    for (raw_key, attribute) in OSGI_KEYS {
        if let Some(value) = raw.get(*raw_key) {
            if !value.trim().is_empty() {
                record.set(*attribute, Value::String(value.clone()));
            }
        }
    }

    Ok(record)
}

fn copy_if_present(raw: &RawRecord, key: &str, attribute: AttributeId, record: &mut Record) {
    if let Some(value) = raw.get(key) {
        record.set(attribute, Value::String(value.clone()));
    }
}

fn apply_record_modified(raw: &RawRecord, record: &mut Record) {
    if let Some(m) = raw.get("m") {
        if let Ok(ms) = m.trim().parse::<i64>() {
            record.set(AttributeId::RecordModified, Value::Long(ms));
        }
    }
}

/// Works around a known producer bug (MIndexer41) that truncated the file
/// extension from the `u` tuple while leaving it present in `i`. When both
/// are present, `i` is non-blank with at least 7 elements, and `u` ends with
/// `|NA`, the 7th element of `i` is appended onto `u` before uinfo
/// expansion.
///
/// Idempotent: once applied, `u` no longer ends with `|NA`, so a second
/// application is a no-op.
fn patch_writer_bug(u: &str, i: Option<&str>) -> String {
    if let Some(i) = i {
        let i = i.trim();
        if !i.is_empty() {
            let i_parts: Vec<&str> = i.split('|').collect();
            if i_parts.len() >= 7 && u.ends_with("|NA") {
                return format!("{u}|{}", i_parts[6]);
            }
        }
    }
    u.to_string()
}

/// Expands a pipe-delimited uinfo compound (the value of `u` or `del`) into
/// groupId/artifactId/version/classifier/fileExtension/packaging
/// attributes.
fn expand_uinfo(record: &mut Record, value: &str) {
    let parts: Vec<&str> = value.split('|').collect();

    if let Some(group_id) = parts.first() {
        record.set(AttributeId::GroupId, Value::String((*group_id).to_string()));
    }
    if let Some(artifact_id) = parts.get(1) {
        record.set(AttributeId::ArtifactId, Value::String((*artifact_id).to_string()));
    }
    if let Some(version) = parts.get(2) {
        record.set(AttributeId::Version, Value::String((*version).to_string()));
    }

    let classifier = parts
        .get(3)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "NA");

    if let Some(classifier) = classifier {
        record.set(AttributeId::Classifier, Value::String(classifier.to_string()));
        if let Some(extension) = parts.get(4) {
            record.set(AttributeId::FileExtension, Value::String((*extension).to_string()));
        }
    } else if let Some(packaging) = parts.get(4) {
        record.set(AttributeId::Packaging, Value::String((*packaging).to_string()));
    }
}

/// Expands the `i` compound (packaging, file-modified, file-size, the three
/// has-* flags, and optionally a file extension) onto `record`.
fn expand_i_tuple(record: &mut Record, i_value: &str) -> Result<(), Error> {
    let parts: Vec<&str> = i_value.split('|').collect();
    if parts.len() < 6 {
        return Err(Error::Expansion(format!(
            "`i` tuple has {} elements, need at least 6",
            parts.len()
        )));
    }

    let packaging_raw = parts[0];
    let packaging_present = packaging_raw != "NA";
    if packaging_present {
        record.set(AttributeId::Packaging, Value::String(packaging_raw.to_string()));
    }

    let file_modified = parts[1].trim().parse::<i64>().unwrap_or(0);
    record.set(AttributeId::FileModified, Value::Long(file_modified));

    let file_size = parts[2].trim().parse::<i64>().unwrap_or(0);
    record.set(AttributeId::FileSize, Value::Long(file_size));

    record.set(AttributeId::HasSources, Value::Bool(parts[3].trim() == "1"));
    record.set(AttributeId::HasJavadoc, Value::Bool(parts[4].trim() == "1"));
    record.set(AttributeId::HasSignature, Value::Bool(parts[5].trim() == "1"));

    if let Some(extension) = parts.get(6) {
        record.set(AttributeId::FileExtension, Value::String((*extension).to_string()));
    } else if packaging_present {
        let has_classifier = record.get(AttributeId::Classifier).is_some();
        let extension = if has_classifier || matches!(packaging_raw, "pom" | "war" | "ear") {
            packaging_raw.to_string()
        } else {
            "jar".to_string()
        };
        record.set(AttributeId::FileExtension, Value::String(extension));
    }

    Ok(())
}
