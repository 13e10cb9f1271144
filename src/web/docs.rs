//! OpenAPI paths for the generic record and script routes
//!
//! These routes are served by generic handlers and closures, so their
//! operations are added to the document here rather than through
//! `#[utoipa::path]`.

use utoipa::Modify;
use utoipa::openapi::path::{
    HttpMethod, OperationBuilder, Parameter, ParameterBuilder, ParameterIn,
};
use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use utoipa::openapi::{
    Array, Content, ContentBuilder, KnownFormat, ObjectBuilder, OpenApi, Ref, RefOr, Required,
    Response, ResponseBuilder, Schema, SchemaFormat, Type,
};

/// Routes documented for one record type
struct RecordDoc {
    /// Collection path (`GET` list, `POST` create); absent when the list has its own handler
    collection: Option<&'static str>,
    /// Item path containing `{id}`
    item: &'static str,
    schema: &'static str,
    tag: &'static str,
    /// Whether `PUT {item}` is routed
    updatable: bool,
    /// `PATCH {item}/{toggle}` routes
    toggles: &'static [&'static str],
}

const RECORD_DOCS: &[RecordDoc] = &[
    RecordDoc {
        collection: Some("/api/platforms"),
        item: "/api/platforms/{id}",
        schema: "Platform",
        tag: "Platforms",
        updatable: true,
        toggles: &["toggle-active"],
    },
    RecordDoc {
        collection: Some("/api/bugs"),
        item: "/api/bugs/{id}",
        schema: "BugReport",
        tag: "Bugs",
        updatable: true,
        toggles: &[],
    },
    RecordDoc {
        collection: Some("/api/targets"),
        item: "/api/targets/{id}",
        schema: "BountyTarget",
        tag: "Targets",
        updatable: true,
        toggles: &["toggle-active"],
    },
    RecordDoc {
        collection: Some("/api/checklists"),
        item: "/api/checklists/{id}",
        schema: "SecurityChecklist",
        tag: "Checklists",
        updatable: true,
        toggles: &[],
    },
    RecordDoc {
        collection: Some("/api/tips"),
        item: "/api/tips/{id}",
        schema: "Tip",
        tag: "Tips",
        updatable: true,
        toggles: &[],
    },
    RecordDoc {
        collection: Some("/api/reading"),
        item: "/api/reading/{id}",
        schema: "ReadingItem",
        tag: "Reading",
        updatable: true,
        toggles: &["toggle-read"],
    },
    RecordDoc {
        collection: Some("/api/links"),
        item: "/api/links/{id}",
        schema: "UsefulLink",
        tag: "Links",
        updatable: true,
        toggles: &[],
    },
    RecordDoc {
        collection: Some("/api/notes"),
        item: "/api/notes/{id}",
        schema: "Note",
        tag: "Notes",
        updatable: true,
        toggles: &["toggle-pin"],
    },
    RecordDoc {
        collection: None,
        item: "/api/campaigns/{id}",
        schema: "ReconCampaign",
        tag: "Recon",
        updatable: false,
        toggles: &[],
    },
    RecordDoc {
        collection: None,
        item: "/api/news/saved/{id}",
        schema: "NewsArticle",
        tag: "News",
        updatable: false,
        toggles: &["toggle-read", "toggle-favorite"],
    },
];

const SCRIPT_KINDS: [&str; 2] = ["attack", "exploit"];

/// Adds record and script operations to [`super::ApiDoc`]
pub struct RecordPaths;

impl Modify for RecordPaths {
    fn modify(&self, openapi: &mut OpenApi) {
        for doc in RECORD_DOCS {
            add_record_paths(openapi, doc);
        }
        for kind in SCRIPT_KINDS {
            add_script_paths(openapi, kind);
        }
    }
}

fn add_record_paths(openapi: &mut OpenApi, doc: &RecordDoc) {
    let paths = &mut openapi.paths;
    let record = || Ref::from_schema_name(doc.schema);

    if let Some(collection) = doc.collection {
        paths.add_path_operation(
            collection,
            vec![HttpMethod::Get],
            operation(doc.tag, format!("List {} records", doc.schema))
                .response("200", ok(data_envelope(Array::new(record()))))
                .response("400", error("Unknown order or filter field")),
        );
        paths.add_path_operation(
            collection,
            vec![HttpMethod::Post],
            operation(doc.tag, format!("Create a {} record", doc.schema))
                .request_body(Some(fields_body(record())))
                .response("201", ok(Ref::from_schema_name("CreatedResponse")))
                .response("400", error("Missing required field or wrong field type")),
        );
    }

    paths.add_path_operation(
        doc.item,
        vec![HttpMethod::Get],
        operation(doc.tag, format!("Get a {} record", doc.schema))
            .parameter(id_param())
            .response("200", ok(data_envelope(record())))
            .response("404", error("Unknown id")),
    );
    if doc.updatable {
        paths.add_path_operation(
            doc.item,
            vec![HttpMethod::Put],
            operation(doc.tag, format!("Update fields of a {} record", doc.schema))
                .parameter(id_param())
                .request_body(Some(fields_body(record())))
                .response("200", ok(mutation_envelope(record())))
                .response("400", error("Invalid field value"))
                .response("404", error("Unknown id")),
        );
    }
    paths.add_path_operation(
        doc.item,
        vec![HttpMethod::Delete],
        operation(doc.tag, format!("Delete a {} record", doc.schema))
            .parameter(id_param())
            .response("200", ok(Ref::from_schema_name("DeleteResponse"))),
    );

    for toggle in doc.toggles {
        paths.add_path_operation(
            format!("{}/{}", doc.item, toggle),
            vec![HttpMethod::Patch],
            operation(doc.tag, format!("Flip a {} flag ({})", doc.schema, toggle))
                .parameter(id_param())
                .response("200", ok(mutation_envelope(record())))
                .response("404", error("Unknown id")),
        );
    }
}

fn add_script_paths(openapi: &mut OpenApi, kind: &str) {
    let paths = &mut openapi.paths;
    let base = format!("/api/{}", kind);
    let script = || Ref::from_schema_name("Script");

    paths.add_path_operation(
        format!("{}/upload", base),
        vec![HttpMethod::Post],
        operation("Scripts", format!("Upload a {} script", kind))
            .request_body(Some(upload_body()))
            .response("201", ok(Ref::from_schema_name("UploadResponse")))
            .response("400", error("Missing or invalid file")),
    );
    paths.add_path_operation(
        format!("{}/scripts", base),
        vec![HttpMethod::Get],
        operation("Scripts", format!("List {} scripts", kind))
            .response("200", ok(data_envelope(Array::new(script())))),
    );
    for item in [format!("{}/scripts/{{id}}", base), format!("{}/{{id}}", base)] {
        paths.add_path_operation(
            item,
            vec![HttpMethod::Delete],
            operation("Scripts", format!("Delete a {} script and its file", kind))
                .parameter(id_param())
                .response("200", ok(Ref::from_schema_name("DeleteResponse"))),
        );
    }
    paths.add_path_operation(
        format!("{}/{{id}}/stop", base),
        vec![HttpMethod::Patch],
        operation("Scripts", format!("Mark a {} script as stopped", kind))
            .parameter(id_param())
            .response("200", ok(mutation_envelope(script())))
            .response("404", error("Unknown id")),
    );
}

fn operation(tag: &str, summary: String) -> OperationBuilder {
    OperationBuilder::new().tag(tag).summary(Some(summary))
}

fn json(schema: impl Into<RefOr<Schema>>) -> Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn ok(schema: impl Into<RefOr<Schema>>) -> Response {
    ResponseBuilder::new()
        .description("Success")
        .content("application/json", json(schema))
        .build()
}

fn error(description: &str) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content("application/json", json(Ref::from_schema_name("ErrorResponse")))
        .build()
}

fn id_param() -> Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(ObjectBuilder::new().schema_type(Type::Integer)))
        .build()
}

fn string() -> ObjectBuilder {
    ObjectBuilder::new().schema_type(Type::String)
}

/// `{data: T}`
fn data_envelope(data: impl Into<RefOr<Schema>>) -> ObjectBuilder {
    ObjectBuilder::new().property("data", data).required("data")
}

/// `{status: "success", data: T}`
fn mutation_envelope(data: impl Into<RefOr<Schema>>) -> ObjectBuilder {
    ObjectBuilder::new()
        .property("status", string())
        .required("status")
        .property("data", data)
        .required("data")
}

fn fields_body(schema: impl Into<RefOr<Schema>>) -> RequestBody {
    RequestBodyBuilder::new()
        .description(Some(
            "Record fields; id and timestamps are ignored, unknown keys are skipped",
        ))
        .required(Some(Required::True))
        .content("application/json", json(schema))
        .build()
}

fn upload_body() -> RequestBody {
    let form = ObjectBuilder::new()
        .property(
            "script",
            string().format(Some(SchemaFormat::KnownFormat(KnownFormat::Binary))),
        )
        .required("script")
        .property("name", string())
        .property("language", string())
        .property("description", string());

    RequestBodyBuilder::new()
        .required(Some(Required::True))
        .content("multipart/form-data", json(form))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi as _;

    #[test]
    fn test_record_routes_are_documented() {
        let doc = super::super::ApiDoc::openapi();
        let paths = &doc.paths.paths;

        let notes = paths.get("/api/notes").expect("notes collection");
        assert!(notes.get.is_some());
        assert!(notes.post.is_some());

        let note = paths.get("/api/notes/{id}").expect("note item");
        assert!(note.get.is_some() && note.put.is_some() && note.delete.is_some());
        assert!(paths.get("/api/notes/{id}/toggle-pin").unwrap().patch.is_some());

        let campaign = paths.get("/api/campaigns/{id}").expect("campaign item");
        assert!(campaign.put.is_none());
        assert!(campaign.delete.is_some());
        // The stop route keeps its annotated handler
        assert!(paths.get("/api/campaigns/{id}/stop").unwrap().patch.is_some());
    }

    #[test]
    fn test_script_routes_are_documented() {
        let doc = super::super::ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for kind in SCRIPT_KINDS {
            assert!(paths.get(&format!("/api/{}/upload", kind)).unwrap().post.is_some());
            assert!(paths.get(&format!("/api/{}/scripts", kind)).unwrap().get.is_some());
            assert!(paths.get(&format!("/api/{}/{{id}}", kind)).unwrap().delete.is_some());
            assert!(paths.get(&format!("/api/{}/{{id}}/stop", kind)).unwrap().patch.is_some());
        }
    }
}
