#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use schemagen_core::ir::{PipelineStep, TypeExpr};
use schemagen_core::{
    CompileError, Emit, EmitContext, GeneratorConfig, Scope, Unsupported, check, generate,
};
use serde_json::json;

const PETSTORE: &str = r##"{
    "openapi": "3.0.3",
    "info": { "title": "Petstore", "version": "1.0.0" },
    "paths": {
        "/pets": {
            "get": {
                "operationId": "listPets",
                "tags": ["pets"],
                "parameters": [
                    { "name": "limit", "in": "query", "schema": { "type": "integer", "maximum": 100 } }
                ],
                "responses": {
                    "200": {
                        "description": "A list of pets",
                        "content": {
                            "application/json": {
                                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                            }
                        }
                    },
                    "default": {
                        "description": "Unexpected error",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
                        }
                    }
                }
            }
        },
        "/pets/{petId}": {
            "parameters": [
                { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } }
            ],
            "get": {
                "operationId": "showPetById",
                "tags": ["pets"],
                "responses": {
                    "200": {
                        "description": "The pet",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                        }
                    },
                    "404": {
                        "description": "Not found",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
                        }
                    }
                }
            },
            "delete": {
                "operationId": "deletePet",
                "tags": ["pets"],
                "responses": {
                    "204": { "description": "Deleted" }
                }
            }
        },
        "/store/orders": {
            "put": {
                "operationId": "placeOrder",
                "tags": ["store"],
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": { "schema": { "$ref": "#/components/schemas/Order" } }
                    }
                },
                "responses": {
                    "200": {
                        "description": "Updated",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Order" } }
                        }
                    },
                    "201": {
                        "description": "Created",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Order" } }
                        }
                    },
                    "400": {
                        "description": "Invalid order",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
                        }
                    }
                }
            }
        },
        "/groups": {
            "get": {
                "operationId": "listGroups",
                "responses": {
                    "200": {
                        "description": "Group tree",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Group" } }
                        }
                    }
                }
            }
        }
    },
    "components": {
        "schemas": {
            "Pet": {
                "type": "object",
                "required": ["id", "name"],
                "properties": {
                    "id": { "type": "integer" },
                    "name": { "type": "string" },
                    "owner": { "$ref": "#/components/schemas/Owner" }
                }
            },
            "Owner": {
                "type": "object",
                "required": ["name"],
                "properties": { "name": { "type": "string", "minLength": 1 } }
            },
            "Order": {
                "type": "object",
                "required": ["id", "quantity"],
                "properties": {
                    "id": { "type": "integer" },
                    "quantity": { "type": "integer", "minimum": 1 }
                }
            },
            "Group": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": { "type": "string" },
                    "subgroups": { "type": "array", "items": { "$ref": "#/components/schemas/Group" } }
                }
            },
            "Error": {
                "type": "object",
                "required": ["code", "message"],
                "properties": {
                    "code": { "type": "integer" },
                    "message": { "type": "string" }
                }
            }
        }
    }
}"##;

fn messages(issues: &[schemagen_core::Issue]) -> Vec<String> {
    issues.iter().map(ToString::to_string).collect()
}

#[test]
fn test_compilation_is_deterministic() {
    let config = GeneratorConfig::default();
    let first = serde_json::to_value(generate(PETSTORE, &config).unwrap()).unwrap();
    let second = serde_json::to_value(generate(PETSTORE, &config).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_scopes_partition_models() {
    let api = generate(PETSTORE, &GeneratorConfig::default()).unwrap();

    let pets = api.module(&Scope::Tag("pets".into())).unwrap();
    assert_eq!(pets.models, vec!["Owner", "Pet"]);
    assert_eq!(pets.operations, vec!["listPets", "showPetById", "deletePet"]);
    assert_eq!(
        pets.imports["common"].iter().collect::<Vec<_>>(),
        vec!["Error"]
    );

    let store = api.module(&Scope::Tag("store".into())).unwrap();
    assert_eq!(store.models, vec!["Order"]);
    assert_eq!(store.operations, vec!["placeOrder"]);
    assert!(store.imports["common"].contains("Error"));

    let common = api.module(&Scope::Default).unwrap();
    assert_eq!(common.module_name, "common");
    assert_eq!(common.models, vec!["Group", "Error"]);
    assert_eq!(common.operations, vec!["listGroups"]);
    assert!(common.imports.is_empty());
}

#[test]
fn test_default_scope_name_comes_from_config() {
    let config = GeneratorConfig {
        default_scope: "shared".into(),
        ..GeneratorConfig::default()
    };
    let api = generate(PETSTORE, &config).unwrap();
    assert_eq!(api.module(&Scope::Default).unwrap().module_name, "shared");
    let pets = api.module(&Scope::Tag("pets".into())).unwrap();
    assert!(pets.imports.contains_key("shared"));
}

#[test]
fn test_recursive_schema_refers_to_itself() {
    let api = generate(PETSTORE, &GeneratorConfig::default()).unwrap();
    let group = api.model("Group").unwrap();

    assert_eq!(group.dependencies, vec!["Group"]);
    assert!(group.declaration.references().contains(&"Group"));
    assert_eq!(group.validator.lazy_references(), vec!["Group"]);

    let envelope = json!({
        "status": 200,
        "mediaType": "application/json",
        "body": { "name": "root", "subgroups": [{ "name": "leaf", "subgroups": [{ "name": 7 }] }] }
    });
    let op = api.operation("listGroups").unwrap();
    let issues = check(op.response.validator.as_ref().unwrap(), &envelope, &api.index).unwrap();
    assert_eq!(
        messages(&issues),
        vec!["body.subgroups[0].subgroups[0].name: Expected string, received number"]
    );
}

#[test]
fn test_response_validator_checks_envelopes() {
    let api = generate(PETSTORE, &GeneratorConfig::default()).unwrap();
    let validator = api
        .operation("showPetById")
        .unwrap()
        .response
        .validator
        .clone()
        .unwrap();

    let ok = json!({
        "status": 200,
        "mediaType": "application/json",
        "body": { "id": 1, "name": "Rex", "owner": { "name": "Ann" } }
    });
    assert!(check(&validator, &ok, &api.index).unwrap().is_empty());

    let not_found = json!({
        "status": 404,
        "mediaType": "application/json",
        "body": { "code": 404, "message": "no such pet" }
    });
    assert!(check(&validator, &not_found, &api.index).unwrap().is_empty());

    let bad = json!({
        "status": 200,
        "mediaType": "application/json",
        "body": { "id": "1", "owner": { "name": "" } }
    });
    assert_eq!(
        messages(&check(&validator, &bad, &api.index).unwrap()),
        vec![
            "body.id: Expected number, received string",
            "body.name: Required",
            "body.owner.name: String must contain at least 1 character(s)",
        ]
    );

    let teapot = json!({ "status": 418, "mediaType": "application/json", "body": null });
    assert_eq!(
        messages(&check(&validator, &teapot, &api.index).unwrap()),
        vec!["status: Unexpected response status: 418"]
    );
}

#[test]
fn test_created_shortcut_uses_schema_name() {
    let api = generate(PETSTORE, &GeneratorConfig::default()).unwrap();
    let op = api.operation("placeOrder").unwrap();

    assert!(op.pipeline.contains(&PipelineStep::CreatedShortcut {
        field: "order".into()
    }));
    assert_eq!(op.pipeline.last(), Some(&PipelineStep::ExtractBody));
    assert_eq!(op.response.error, TypeExpr::reference("Error"));

    let cx = EmitContext::new(&api.index, &GeneratorConfig::default());
    assert_eq!(
        op.response.result.emit_with(&cx),
        "{ created: true; order: Order } | { created: false; order: Order }"
    );
}

#[test]
fn test_no_content_discards_body() {
    let api = generate(PETSTORE, &GeneratorConfig::default()).unwrap();
    let op = api.operation("deletePet").unwrap();

    assert_eq!(
        op.pipeline,
        vec![PipelineStep::Validate, PipelineStep::DiscardBody]
    );
    assert_eq!(op.response.result, TypeExpr::void());
    assert_eq!(op.emit(), "deletePet(petId: string): DELETE /pets/{petId} => void");
}

#[test]
fn test_operation_signatures() {
    let api = generate(PETSTORE, &GeneratorConfig::default()).unwrap();
    let cx = EmitContext::new(&api.index, &GeneratorConfig::default());

    assert_eq!(
        api.operation("listPets").unwrap().emit_with(&cx),
        "listPets(limit?: number): GET /pets => Pet[]"
    );
    assert_eq!(
        api.operation("showPetById").unwrap().emit_with(&cx),
        "showPetById(petId: string): GET /pets/{petId} => Pet"
    );
}

#[test]
fn test_validation_can_be_disabled() {
    let config = GeneratorConfig {
        validate_responses: false,
        ..GeneratorConfig::default()
    };
    let api = generate(PETSTORE, &config).unwrap();
    for op in &api.operations {
        assert!(op.response.validator.is_none(), "{}", op.name);
        assert!(!op.pipeline.contains(&PipelineStep::Validate), "{}", op.name);
    }
}

#[test]
fn test_matrix_query_style_is_rejected() {
    let document = r##"{
        "openapi": "3.0.3",
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "searchPets",
                    "parameters": [
                        { "name": "fields", "in": "query", "style": "matrix", "schema": { "type": "string" } }
                    ],
                    "responses": { "204": { "description": "ok" } }
                }
            }
        }
    }"##;

    let err = generate(document, &GeneratorConfig::default()).unwrap_err();
    let CompileError::Unsupported(Unsupported::ParameterStyle {
        style,
        location,
        parameter,
        ..
    }) = err
    else {
        panic!("expected a parameter style error, got {err:?}");
    };
    assert_eq!(style, "matrix");
    assert_eq!(location, "query");
    assert_eq!(parameter, "fields");
}

#[test]
fn test_unresolved_reference_is_reported() {
    let document = r##"{
        "openapi": "3.0.3",
        "paths": {
            "/ghosts": {
                "get": {
                    "operationId": "listGhosts",
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {
                                "application/json": { "schema": { "$ref": "#/components/schemas/Ghost" } }
                            }
                        }
                    }
                }
            }
        }
    }"##;

    assert_eq!(
        generate(document, &GeneratorConfig::default()).unwrap_err(),
        CompileError::unresolved("Ghost")
    );
}
