use super::{ObjectShape, Schema, SchemaKind};

/// Two argument schemas declared for the same procedure can't be combined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{path}' was declared as {previous} and then as {next}")]
pub struct MergeError {
    pub path: String,
    pub previous: &'static str,
    pub next: &'static str,
}

impl Schema {
    /// Structurally intersect `self` with a later declaration `other`.
    ///
    /// Objects merge field by field and a field required by either side stays required, as does `strict`. Nullable values, array items and transforms sharing a codec merge what they wrap. Otherwise when both sides declare the same kind of value at the same place, `other` wins. Different kinds at the same place are an error, except `any` which yields to the other side.
    pub fn intersect(&self, other: &Schema) -> Result<Schema, MergeError> {
        intersect_at("$", self, other)
    }
}

fn intersect_at(path: &str, previous: &Schema, next: &Schema) -> Result<Schema, MergeError> {
    let kind = match (previous.kind(), next.kind()) {
        (SchemaKind::Object(a), SchemaKind::Object(b)) => {
            let mut fields = a.fields.clone();
            for field in &b.fields {
                match fields.iter_mut().find(|f| f.name == field.name) {
                    Some(existing) => {
                        existing.schema = intersect_at(
                            &format!("{path}.{}", field.name),
                            &existing.schema,
                            &field.schema,
                        )?;
                        existing.required |= field.required;
                    }
                    None => fields.push(field.clone()),
                }
            }

            SchemaKind::Object(ObjectShape {
                fields,
                strict: a.strict || b.strict,
            })
        }
        (SchemaKind::Nullable(a), SchemaKind::Nullable(b)) => {
            SchemaKind::Nullable(intersect_at(path, a, b)?)
        }
        (
            SchemaKind::Array { item: a, .. },
            SchemaKind::Array {
                item: b,
                min_items,
                max_items,
            },
        ) => SchemaKind::Array {
            item: intersect_at(&format!("{path}[]"), a, b)?,
            min_items: *min_items,
            max_items: *max_items,
        },
        (
            SchemaKind::Transform { wire: a, codec: c1 },
            SchemaKind::Transform { wire: b, codec },
        ) if c1.name() == codec.name() => SchemaKind::Transform {
            wire: intersect_at(path, a, b)?,
            codec: codec.clone(),
        },
        (SchemaKind::Any, _) => return Ok(next.clone()),
        (_, SchemaKind::Any) => return Ok(previous.clone()),
        (a, b) if a.name() == b.name() => return Ok(next.clone()),
        (a, b) => {
            return Err(MergeError {
                path: path.to_string(),
                previous: a.name(),
                next: b.name(),
            })
        }
    };

    let merged = Schema::from_kind(kind);
    Ok(match next.get_description().or(previous.get_description()) {
        Some(description) => merged.description(description),
        None => merged,
    })
}
