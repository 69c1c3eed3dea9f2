use catsim::server::routes::route_request;

fn json_body(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("response should be valid json")
}

#[test]
fn health_endpoint_returns_ok_json() {
    let response = route_request("GET", "/api/health", "");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type, "application/json");
    assert!(response.body.contains("\"status\": \"ok\""));
}

#[test]
fn simulate_endpoint_returns_summary() {
    let body = r#"{"encounter":{"fight_length":30},"replicates":40,"seed":7,"trinkets":["dragonspine_trophy"]}"#;
    let response = route_request("POST", "/api/simulate", body);

    assert_eq!(response.status_code, 200);
    let payload = json_body(&response.body);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["engine"], "catsim");
    assert_eq!(payload["replicates"], 40);
    assert_eq!(payload["seed"], 7);

    let summary = &payload["summary"];
    assert!(summary["dps"]["mean"].as_f64().unwrap() > 0.0);
    assert!(summary["dps"]["std_dev"].as_f64().unwrap() >= 0.0);
    let trinkets = summary["trinkets"].as_array().expect("trinket uptimes should be an array");
    assert_eq!(trinkets.len(), 1);
    assert_eq!(trinkets[0]["name"], "dragonspine_trophy");
}

#[test]
fn simulate_endpoint_is_deterministic_for_a_seed() {
    let body = r#"{"encounter":{"fight_length":20},"replicates":30,"seed":5}"#;
    let first = json_body(&route_request("POST", "/api/simulate", body).body);
    let second = json_body(&route_request("POST", "/api/simulate", body).body);
    assert_eq!(first["summary"], second["summary"]);
}

#[test]
fn simulate_endpoint_rejects_unknown_debuffs() {
    let body = r#"{"encounter":{"debuffs":["faerie_fire","demo_shout"]},"replicates":5}"#;
    let response = route_request("POST", "/api/simulate", body);

    assert_eq!(response.status_code, 400);
    let payload = json_body(&response.body);
    assert_eq!(payload["status"], "error");
    let message = payload["message"].as_str().unwrap();
    assert!(message.contains("demo_shout"));
    assert!(message.contains("sunder_armor"));
}

#[test]
fn simulate_endpoint_rejects_malformed_json() {
    let response = route_request("POST", "/api/simulate", "{\"replicates\":");
    assert_eq!(response.status_code, 400);
}

#[test]
fn weights_endpoint_reports_not_computed_below_minimum() {
    let body = r#"{"encounter":{"fight_length":10},"replicates":500}"#;
    let response = route_request("POST", "/api/weights", body);

    assert_eq!(response.status_code, 200);
    let payload = json_body(&response.body);
    assert_eq!(payload["outcome"]["status"], "not_computed");
    assert_eq!(payload["outcome"]["requested"], 500);
}

#[test]
fn trace_endpoint_returns_json_or_csv() {
    let body = r#"{"encounter":{"fight_length":12},"seed":9}"#;

    let response = route_request("POST", "/api/trace", body);
    assert_eq!(response.status_code, 200);
    let payload = json_body(&response.body);
    assert!(!payload["events"].as_array().unwrap().is_empty());

    let response = route_request("POST", "/api/trace?format=csv", body);
    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type, "text/csv");
    let header = response.body.lines().next().unwrap();
    assert_eq!(header, "time,event,outcome,energy,combo_points,mana");
}

#[test]
fn presets_endpoints_list_and_look_up_trinkets() {
    let response = route_request("GET", "/api/presets", "");
    assert_eq!(response.status_code, 200);
    assert_eq!(json_body(&response.body).as_array().map(Vec::len), Some(9));

    let response = route_request("GET", "/api/presets/bloodlust_brooch", "");
    assert_eq!(response.status_code, 200);
    assert_eq!(json_body(&response.body)["config"]["proc_name"], "Lust for Battle");

    let response = route_request("GET", "/api/presets/lucky_rabbit_foot", "");
    assert_eq!(response.status_code, 404);
}

#[test]
fn strategy_endpoint_lists_keys_and_debuffs() {
    let response = route_request("GET", "/api/strategy", "");
    assert_eq!(response.status_code, 200);
    let payload = json_body(&response.body);
    assert_eq!(payload["keys"].as_array().map(Vec::len), Some(19));
    assert_eq!(payload["debuffs"].as_array().map(Vec::len), Some(7));
    assert_eq!(payload["defaults"]["finisher"], "rip");
}

#[test]
fn unknown_route_returns_404() {
    let response = route_request("DELETE", "/api/simulate", "");
    assert_eq!(response.status_code, 404);
}
