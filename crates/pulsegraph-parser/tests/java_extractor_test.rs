use pulsegraph_core::{CodeEdge, CodeGraph, NodeType};
use pulsegraph_parser::{ExtractionHeuristics, CallSiteSets, TreeSitterParser};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const GATEWAY: &str = r#"package com.playground.gateway;

import org.springframework.web.bind.annotation.*;
import org.springframework.web.client.RestTemplate;

@RestController
@RequestMapping("/api/")
public class GatewayController {

    private final RestTemplate rest = new RestTemplate();

    @PostMapping("/login")
    public String login(@RequestBody String body) {
        return rest.postForObject("http://auth-service:8081/auth/login", body, String.class);
    }

    @GetMapping("/orders/{id}")
    public String order(@PathVariable String id) {
        String base = "http://order-service:8082/orders/";
        return rest.getForObject(base + id, String.class);
    }

    @GetMapping
    public String health() {
        return "UP";
    }

    static class Fallback {
        String reply() {
            return "http://status-page";
        }
    }
}
"#;

const REPOSITORY: &str = r#"package com.playground.orders;

public interface OrderRepository {
    Order findByCode(String code);

    default int size() {
        return 0;
    }
}
"#;

fn parse(source: &str, file: &str) -> CodeGraph {
    TreeSitterParser::new().parse_content(source, file).unwrap()
}

#[test]
fn gateway_nodes_carry_routes() {
    let graph = parse(GATEWAY, "GatewayController.java");
    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "GatewayController.login",
            "GatewayController.order",
            "GatewayController.health",
            "GatewayController.reply",
        ]
    );
    assert!(graph.nodes.iter().all(|n| n.node_type == NodeType::Method));
    assert!(graph.nodes.iter().all(|n| n.name == n.id));

    let login = &graph.nodes[0];
    assert_eq!(login.metadata.http_method.as_deref(), Some("POST"));
    assert_eq!(login.metadata.route.as_deref(), Some("/api/login"));
    assert_eq!(login.metadata.class_name.as_deref(), Some("GatewayController"));
    assert_eq!(login.start_line, 12);
    assert_eq!(login.end_line, 15);

    let order = &graph.nodes[1];
    assert_eq!(order.metadata.route.as_deref(), Some("/api/orders/{id}"));

    // `@GetMapping` without a path does not compose a route.
    let health = &graph.nodes[2];
    assert!(health.metadata.http_method.is_none());
    assert!(health.metadata.route.is_none());

    let reply = &graph.nodes[3];
    assert!(reply.metadata.route.is_none());
}

#[test]
fn routes_need_both_class_and_method_paths() {
    let without_class_mapping = parse(
        "@RestController\nclass C {\n    @GetMapping(\"/x\")\n    String x() { return \"\"; }\n}\n",
        "C.java",
    );
    let node = &without_class_mapping.nodes[0];
    assert_eq!(node.id, "C.x");
    assert!(node.metadata.route.is_none());
    assert!(node.metadata.http_method.is_none());

    let without_method_path = parse(
        "@RequestMapping(\"/api\")\nclass C {\n    @PostMapping\n    void create() {}\n}\n",
        "C.java",
    );
    let node = &without_method_path.nodes[0];
    assert!(node.metadata.route.is_none());
    assert!(node.metadata.http_method.is_none());
    assert!(node.route_key().is_none());
}

#[test]
fn gateway_edges_follow_url_literals() {
    let graph = parse(GATEWAY, "GatewayController.java");
    assert_eq!(
        graph.edges,
        vec![
            CodeEdge::calls("GatewayController.login", "auth-service.login"),
            CodeEdge::calls("GatewayController.order", "order-service.orders"),
            CodeEdge::calls("GatewayController.reply", "status-page.root"),
        ]
    );
}

#[test]
fn bodiless_methods_still_produce_nodes() {
    let graph = parse(REPOSITORY, "OrderRepository.java");
    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["OrderRepository.findByCode", "OrderRepository.size"]);
    assert!(graph.edges.is_empty());
}

#[test]
fn custom_url_pattern_is_used() {
    let heuristics = ExtractionHeuristics::with_url_pattern(r"lb://([a-z-]+)(/[a-z/]*)?").unwrap();
    let parser = TreeSitterParser::with_heuristics(heuristics, CallSiteSets::default());
    let graph = parser
        .parse_content(
            "class Client { void pay() { call(\"lb://payment-service/pay\"); call(\"http://ignored/x\"); } }",
            "Client.java",
        )
        .unwrap();
    assert_eq!(graph.edges, vec![CodeEdge::calls("Client.pay", "payment-service.pay")]);
}

fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

#[test]
fn project_extraction_skips_dirs_and_unreadable_files() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "gateway/src/GatewayController.java", GATEWAY.as_bytes());
    write(tmp.path(), "orders/src/OrderRepository.java", REPOSITORY.as_bytes());
    write(tmp.path(), "orders/build/Generated.java", b"class Generated { void gen() {} }");
    write(tmp.path(), "orders/src/Latin1.java", &[0x63, 0x6c, 0xff, 0xfe]);

    let skip = vec!["build".to_string()];
    let graph = TreeSitterParser::new().parse_project(tmp.path(), &skip).unwrap();

    assert_eq!(graph.nodes.len(), 6);
    assert_eq!(graph.nodes[0].id, "GatewayController.login");
    assert_eq!(graph.nodes[4].id, "OrderRepository.findByCode");
    assert!(graph.nodes.iter().all(|n| !n.id.starts_with("Generated")));
    assert_eq!(graph.edges.len(), 3);
}

#[test]
fn project_extraction_requires_existing_root() {
    let tmp = TempDir::new().unwrap();
    let result = TreeSitterParser::new().parse_project(&tmp.path().join("missing"), &[]);
    assert!(result.is_err());
}
