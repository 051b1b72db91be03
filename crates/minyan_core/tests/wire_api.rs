use minyan_core::{
    dispatch_tool, tool_declarations, Broadcast, BroadcastApi, BroadcastService, NearbyParams,
    SqliteBroadcastRepository,
};
use serde_json::{json, Value};
use uuid::Uuid;

fn api() -> BroadcastApi<SqliteBroadcastRepository> {
    BroadcastApi::new(BroadcastService::new(
        SqliteBroadcastRepository::open_in_memory().unwrap(),
    ))
}

fn mincha_body() -> Value {
    json!({
        "latitude": 40.7128,
        "longitude": -74.0060,
        "minyanType": "mincha",
        "earliestTime": "2025-03-26T13:00:00Z",
        "latestTime": "2025-03-26T14:00:00Z",
    })
}

fn created_id(api: &BroadcastApi<SqliteBroadcastRepository>, body: &Value) -> String {
    let response = api.create(body);
    assert_eq!(response.status, 201, "{:?}", response.body);
    response.body.unwrap()["id"].as_str().unwrap().to_string()
}

#[test]
fn create_returns_201_with_id_and_message() {
    let api = api();
    let response = api.create(&mincha_body());

    assert_eq!(response.status, 201);
    let body = response.body.unwrap();
    assert_eq!(body["message"], "Broadcast created successfully");
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
}

#[test]
fn get_returns_camel_case_record_with_utc_times() {
    let api = api();
    let id = created_id(&api, &mincha_body());

    let response = api.get(&id);
    assert_eq!(response.status, 200);
    let body = response.body.unwrap();
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["latitude"], 40.7128);
    assert_eq!(body["longitude"], -74.006);
    assert_eq!(body["minyanType"], "mincha");
    assert_eq!(body["earliestTime"], "2025-03-26T13:00:00Z");
    assert_eq!(body["latestTime"], "2025-03-26T14:00:00Z");
    assert_eq!(body["active"], true);
    assert!(body["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn get_body_decodes_back_into_the_stored_record() {
    let api = api();
    let id = created_id(&api, &mincha_body());

    let decoded: Broadcast = serde_json::from_value(api.get(&id).body.unwrap()).unwrap();
    let stored = api.service().get(Uuid::parse_str(&id).unwrap()).unwrap();
    assert_eq!(decoded, stored);
}

#[test]
fn windows_outside_four_digit_years_are_rejected_with_400() {
    let api = api();

    for (earliest, latest) in [
        ("9999-12-31T00:00:00Z", "+10000-01-01T00:00:00"),
        ("-0010-01-01T00:00:00", "-0002-01-01T00:00:00"),
        ("+10000-01-01T00:00:00", "+10000-01-02T00:00:00"),
    ] {
        let mut body = mincha_body();
        body["earliestTime"] = json!(earliest);
        body["latestTime"] = json!(latest);
        let response = api.create(&body);
        assert_eq!(response.status, 400, "{earliest}..{latest}: {:?}", response.body);
    }

    let id = created_id(&api, &mincha_body());
    let response = api.update(&id, &json!({ "latestTime": "+10000-01-01T00:00:00" }));
    assert_eq!(response.status, 400, "{:?}", response.body);
    assert_eq!(api.get(&id).body.unwrap()["latestTime"], "2025-03-26T14:00:00Z");
}

#[test]
fn far_future_window_does_not_break_nearby_for_other_records() {
    let api = api();
    let id = created_id(&api, &mincha_body());

    let mut future = mincha_body();
    future["earliestTime"] = json!("+10000-01-01T00:00:00");
    future["latestTime"] = json!("+10000-01-02T00:00:00");
    assert_eq!(api.create(&future).status, 400);

    let response = api.nearby(&NearbyParams::from_pairs([
        ("latitude", "40.7130"),
        ("longitude", "-74.0059"),
        ("radius", "2"),
    ]));
    assert_eq!(response.status, 200, "{:?}", response.body);
    let hits = response.body.unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["id"], id.as_str());
}

#[test]
fn create_rejects_bad_input_with_400() {
    let api = api();

    for (field, value) in [
        ("latitude", json!(91)),
        ("longitude", json!(181)),
        ("minyanType", json!("foo")),
        ("minyanType", json!("Mincha")),
        ("earliestTime", json!("2025-03-26T15:00:00Z")),
        ("latestTime", json!("not a time")),
    ] {
        let mut body = mincha_body();
        body[field] = value;
        let response = api.create(&body);
        assert_eq!(response.status, 400, "{field}: {:?}", response.body);
        assert!(response.error_message().is_some());
    }

    let mut missing = mincha_body();
    missing.as_object_mut().unwrap().remove("latestTime");
    let response = api.create(&missing);
    assert_eq!(response.status, 400);
    let message = response.error_message().unwrap();
    assert!(message.contains("latestTime"), "{message}");

    assert_eq!(api.create(&json!([1, 2, 3])).status, 400);
}

#[test]
fn unknown_ids_return_404() {
    let api = api();
    let missing = Uuid::new_v4().to_string();

    for response in [
        api.get(&missing),
        api.update(&missing, &json!({ "active": false })),
        api.delete(&missing),
        api.get("not-a-uuid"),
    ] {
        assert_eq!(response.status, 404);
        assert_eq!(response.error_message(), Some("Broadcast not found"));
    }
}

#[test]
fn update_returns_200_and_changes_only_supplied_fields() {
    let api = api();
    let id = created_id(&api, &mincha_body());

    let response = api.update(&id, &json!({ "latestTime": "2025-03-26T16:00:00Z" }));
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body.unwrap()["message"],
        "Broadcast updated successfully"
    );

    let body = api.get(&id).body.unwrap();
    assert_eq!(body["latestTime"], "2025-03-26T16:00:00Z");
    assert_eq!(body["earliestTime"], "2025-03-26T13:00:00Z");
    assert_eq!(body["minyanType"], "mincha");
    assert_eq!(body["active"], true);
}

#[test]
fn update_rejects_immutable_fields_and_inverted_windows() {
    let api = api();
    let id = created_id(&api, &mincha_body());

    assert_eq!(api.update(&id, &json!({ "id": Uuid::new_v4().to_string() })).status, 400);
    assert_eq!(
        api.update(&id, &json!({ "createdAt": "2020-01-01T00:00:00Z" }))
            .status,
        400
    );
    assert_eq!(
        api.update(&id, &json!({ "earliestTime": "2025-03-26T15:00:00Z" }))
            .status,
        400
    );
    assert_eq!(api.update(&id, &json!({ "active": "no" })).status, 400);

    let body = api.get(&id).body.unwrap();
    assert_eq!(body["earliestTime"], "2025-03-26T13:00:00Z");
}

#[test]
fn delete_returns_204_then_404() {
    let api = api();
    let id = created_id(&api, &mincha_body());

    let response = api.delete(&id);
    assert_eq!(response.status, 204);
    assert!(response.body.is_none());

    assert_eq!(api.delete(&id).status, 404);
    assert_eq!(api.get(&id).status, 404);
}

#[test]
fn nearby_scenarios_over_the_wire() {
    let api = api();
    let mincha_id = created_id(&api, &mincha_body());
    let mut maariv = mincha_body();
    maariv["minyanType"] = json!("maariv");
    let maariv_id = created_id(&api, &maariv);

    let near_mincha = api.nearby(&NearbyParams::from_pairs([
        ("latitude", "40.7130"),
        ("longitude", "-74.0059"),
        ("radius", "2"),
        ("minyanType", "mincha"),
    ]));
    assert_eq!(near_mincha.status, 200);
    let hits = near_mincha.body.unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], mincha_id.as_str());

    let los_angeles = api.nearby(&NearbyParams::from_pairs([
        ("latitude", "34.0522"),
        ("longitude", "-118.2437"),
        ("radius", "2"),
    ]));
    assert_eq!(los_angeles.status, 200);
    assert_eq!(los_angeles.body.unwrap(), json!([]));

    let any_type = api.nearby(&NearbyParams::from_pairs([
        ("latitude", "40.7130"),
        ("longitude", "-74.0059"),
        ("radius", "2"),
        ("minyanType", ""),
    ]));
    let ids: Vec<String> = any_type
        .body
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&mincha_id));
    assert!(ids.contains(&maariv_id));
}

#[test]
fn nearby_rejects_missing_or_invalid_parameters() {
    let api = api();

    for pairs in [
        vec![("latitude", "40.7"), ("longitude", "-74.0")],
        vec![("latitude", "91"), ("longitude", "0"), ("radius", "1")],
        vec![("latitude", "0"), ("longitude", "181"), ("radius", "1")],
        vec![("latitude", "0"), ("longitude", "0"), ("radius", "-1")],
        vec![("latitude", "0"), ("longitude", "0"), ("radius", "wide")],
        vec![
            ("latitude", "0"),
            ("longitude", "0"),
            ("radius", "1"),
            ("minyanType", "foo"),
        ],
    ] {
        let response = api.nearby(&NearbyParams::from_pairs(pairs.clone()));
        assert_eq!(response.status, 400, "{pairs:?}");
    }
}

#[test]
fn tool_calls_route_to_handlers() {
    let api = api();

    let created = dispatch_tool(&api, "createBroadcast", &mincha_body());
    assert!(created.success);
    let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

    let found = dispatch_tool(
        &api,
        "findNearbyBroadcasts",
        &json!({ "latitude": 40.7130, "longitude": -74.0059, "radius": 2, "minyanType": "mincha" }),
    );
    assert!(found.success);
    let data = found.data.unwrap();
    assert_eq!(data[0]["id"], id.as_str());

    let rejected = dispatch_tool(
        &api,
        "createBroadcast",
        &json!({ "latitude": 91, "longitude": 0, "minyanType": "mincha",
                 "earliestTime": "2025-03-26T13:00:00Z", "latestTime": "2025-03-26T14:00:00Z" }),
    );
    assert!(!rejected.success);
    assert_eq!(rejected.status_code, Some(400));

    let unknown = dispatch_tool(&api, "deleteEverything", &json!({}));
    assert!(!unknown.success);
    assert_eq!(unknown.error.as_deref(), Some("Unknown function: deleteEverything"));
    assert_eq!(
        serde_json::to_value(&unknown).unwrap(),
        json!({ "success": false, "error": "Unknown function: deleteEverything" })
    );
}

#[test]
fn tool_declarations_describe_both_operations() {
    let declarations = tool_declarations();
    let names: Vec<&str> = declarations.iter().map(|decl| decl.name).collect();
    assert_eq!(names, vec!["createBroadcast", "findNearbyBroadcasts"]);

    let create = &declarations[0].parameters;
    assert_eq!(
        create["required"],
        json!(["latitude", "longitude", "minyanType", "earliestTime", "latestTime"])
    );
    assert_eq!(
        create["properties"]["minyanType"]["enum"],
        json!(["shacharit", "mincha", "maariv"])
    );

    let nearby = &declarations[1].parameters;
    assert_eq!(nearby["required"], json!(["latitude", "longitude", "radius"]));
}
