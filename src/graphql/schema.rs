//! Dynamic GraphQL schema derived from the signal catalog.
//!
//! Every catalog branch becomes an object type and every signal a nullable
//! scalar field. The root field loads a fresh snapshot from the configured
//! backend; nested resolvers walk the resulting [`SignalTree`] so a missing
//! subtree or leaf resolves to null instead of failing the query.

use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, Object, ResolverContext, Schema, TypeRef,
};
use async_graphql::ErrorExtensions;

use crate::authz::PermissionSet;
use crate::catalog::{BranchDef, Catalog, SignalDef};
use crate::errors::VssError;
use crate::graphql::guard::PermissionGuard;
use crate::signal::SignalTree;
use crate::storage::SignalSource;

pub const QUERY_TYPE: &str = "Query";

/// Build the executable schema. `source` is attached as schema data and read
/// by the root resolvers on every request.
pub fn build_schema(catalog: &Catalog, source: SignalSource) -> Result<Schema, VssError> {
    let mut query = Object::new(QUERY_TYPE);
    for root in catalog.roots() {
        query = query.field(root_field(root));
    }

    let mut builder = Schema::build(QUERY_TYPE, None, None).register(query);
    for branch in catalog.branches() {
        builder = builder.register(branch_object(branch));
    }

    let schema = builder.data(source).finish()?;
    tracing::debug!(
        signals = catalog.signals().len(),
        types = catalog.branches().len(),
        "Built signal schema"
    );
    Ok(schema)
}

fn root_field(root: &BranchDef) -> Field {
    let segment = root.path.name().to_string();
    Field::new(
        root.field_name(),
        TypeRef::named(root.type_name()),
        move |ctx| {
            let segment = segment.clone();
            FieldFuture::new(async move {
                let source = ctx.data::<SignalSource>()?;
                let mut tree = match source.load_tree().await {
                    Ok(tree) => tree,
                    Err(e) => {
                        tracing::error!(backend = source.backend().name(), error = %e, "Failed to load signals");
                        report_field_error(&ctx, e.extend());
                        return Ok(None);
                    }
                };
                Ok(tree.take_branch(&segment).map(FieldValue::owned_any))
            })
        },
    )
    .description(root.description.clone())
}

fn branch_object(branch: &BranchDef) -> Object {
    let mut object = Object::new(branch.type_name()).description(branch.description.clone());
    for child in &branch.branches {
        object = object.field(branch_field(child));
    }
    for signal in &branch.signals {
        object = object.field(signal_field(signal));
    }
    object
}

fn branch_field(child: &BranchDef) -> Field {
    let segment = child.path.name().to_string();
    Field::new(
        child.field_name(),
        TypeRef::named(child.type_name()),
        move |ctx| {
            let segment = segment.clone();
            FieldFuture::new(async move {
                let parent = ctx.parent_value.try_downcast_ref::<SignalTree>()?;
                Ok(parent.branch(&segment).map(|child| FieldValue::borrowed_any(child)))
            })
        },
    )
    .description(child.description.clone())
}

fn signal_field(signal: &SignalDef) -> Field {
    let segment = signal.path.name().to_string();
    let kind = signal.kind;
    let guard = Arc::new(PermissionGuard::new(
        signal.path.to_string(),
        signal.required.clone(),
    ));
    let description = signal_description(&signal.description, guard.required());

    Field::new(
        signal.field_name(),
        TypeRef::named(kind.graphql_type()),
        move |ctx| {
            let segment = segment.clone();
            let guard = guard.clone();
            FieldFuture::new(async move {
                if let Err(e) = guard.check(&ctx) {
                    report_field_error(&ctx, e);
                    return Ok(None);
                }
                let parent = ctx.parent_value.try_downcast_ref::<SignalTree>()?;
                Ok(parent.leaf(&segment).and_then(|value| kind.coerce(value)))
            })
        },
    )
    .description(description)
}

fn signal_description(description: &str, required: &PermissionSet) -> String {
    if required.is_empty() {
        return description.to_string();
    }
    let required: Vec<&str> = required.iter().collect();
    format!(
        "{}\n\nRequires permissions: {}",
        description,
        required.join(", ")
    )
}

/// Attach `err` to the current field's path and let the field resolve to
/// null. Returning it from the resolver would null the enclosing object.
fn report_field_error(ctx: &ResolverContext<'_>, err: async_graphql::Error) {
    ctx.add_error(ctx.set_error_path(err.into_server_error(ctx.item.pos)));
}
