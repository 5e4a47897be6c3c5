use pulsegraph_core::{InjectionMode, InjectionOptions, Instrumenter};
use pulsegraph_parser::{CallSiteSets, ExtractionHeuristics, TreeSitterParser};
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

const ORDER_CONTROLLER: &str = r#"package com.playground.orders;

import org.springframework.web.bind.annotation.*;

@RestController
public class OrderController {

    private final OrderRepository repo;
    private final RestTemplate rest;

    @PostMapping("/orders")
    public Order create(@RequestBody Order order) {
        validate(order);
        Order saved = repo.save(order);
        if (saved.isPriority()) {
            rest.postForObject("http://notify/send", saved, Void.class);
        }
        return saved;
    }

    @GetMapping("/orders/{id}")
    public Order find(@PathVariable Long id) { return repo.findById(id).orElseThrow(); }

    public static Order empty() {
        return new Order();
    }
}
"#;

const NESTED: &str = r#"public class Outer {
    public void a() { inner(); }

    static class Helper {
        void b() {
            x();
        }
    }

    enum Mode {
        ON;
        void flip() { toggle(); }
    }
}
"#;

const ANONYMOUS: &str = r#"public class Jobs {
    public Runnable job() {
        return new Runnable() {
            public void run() {
                repo.save(x);
            }
        };
    }
}
"#;

const SPAN_COLLISION: &str = r#"package billing;

import com.acme.tracing.Span;

public class Billing {
    public void charge() {
        Span audit = Span.open();
        audit.close();
    }
}
"#;

const SPAN_ONLY: &str = r#"package audit;

import io.opentelemetry.api.trace.Span;

public class Auditor {
    public void record() {
        Span.current().addEvent("audit");
    }
}
"#;

const TRACER_CLASS: &str = r#"class Tracer {
    void mark() {
        System.out.println("mark");
    }
}
"#;

fn inject(source: &str, file: &str) -> String {
    TreeSitterParser::new().inject(source, file, &InjectionOptions::default())
}

#[test]
fn dependency_events_precede_their_statement() {
    let out = inject(ORDER_CONTROLLER, "OrderController.java");

    assert!(out.contains(
        "        span.addEvent(\"db_call\", Attributes.of(AttributeKey.stringKey(\"db.statement\"), \"save\"));\n        Order saved = repo.save(order);"
    ));
    assert!(out.contains(
        "        span.addEvent(\"external_api_call\", Attributes.of(AttributeKey.stringKey(\"api.operation\"), \"postForObject\"));\n        if (saved.isPriority()) {"
    ));
    // One-line body: the event goes inline before the return.
    assert!(out.contains(
        "try (var scope = span.makeCurrent()) { span.addEvent(\"db_call\", Attributes.of(AttributeKey.stringKey(\"db.statement\"), \"findById\")); return repo.findById(id).orElseThrow();  } finally { span.end(); } }"
    ));
    assert!(out.contains("tracer.spanBuilder(\"OrderController.create\")"));
    assert!(out.contains("tracer.spanBuilder(\"OrderController.find\")"));
    assert!(!out.contains("OrderController.empty"));
    assert_eq!(out.matches("@Autowired private Tracer tracer;").count(), 1);
    assert_eq!(out.matches("// [pulsegraph] Auto-Import").count(), 1);
}

#[test]
fn instrumentation_is_idempotent() {
    for (source, file) in [
        (ORDER_CONTROLLER, "OrderController.java"),
        (NESTED, "Outer.java"),
        (ANONYMOUS, "Jobs.java"),
        (SPAN_COLLISION, "Billing.java"),
        (TRACER_CLASS, "Tracer.java"),
        (SPAN_ONLY, "Auditor.java"),
    ] {
        let once = inject(source, file);
        assert_ne!(once, source, "{} was not instrumented", file);
        let twice = inject(&once, file);
        assert_eq!(once, twice, "second pass changed {}", file);
    }
}

#[test]
fn nested_classes_get_their_own_field_and_span_names() {
    let out = inject(NESTED, "Outer.java");
    assert_eq!(out.matches("@Autowired private Tracer tracer;").count(), 2);
    assert!(out.contains("tracer.spanBuilder(\"Outer.a\")"));
    assert!(out.contains("tracer.spanBuilder(\"Helper.b\")"));
    // Enum methods are left alone.
    assert!(!out.contains("Mode.flip"));
}

#[test]
fn anonymous_class_bodies_are_not_instrumented() {
    let out = inject(ANONYMOUS, "Jobs.java");
    assert!(out.contains("tracer.spanBuilder(\"Jobs.job\")"));
    assert!(!out.contains("Jobs.run"));
    assert!(!out.contains("db_call"));
}

#[test]
fn span_collision_switches_to_qualified_names() {
    let out = inject(SPAN_COLLISION, "Billing.java");
    assert!(out.contains("@Autowired private io.opentelemetry.api.trace.Tracer tracer;"));
    assert!(out.contains(
        "io.opentelemetry.api.trace.Span span = tracer.spanBuilder(\"Billing.charge\").startSpan();"
    ));
    assert!(!out.contains("import io.opentelemetry.api.trace.Span;"));
    assert!(!out.contains("import io.opentelemetry.api.trace.Tracer;"));
    assert!(out.contains("import io.opentelemetry.api.common.Attributes;"));
    assert!(out.contains("import com.acme.tracing.Span;"));
}

#[test]
fn partial_trace_imports_are_completed() {
    let out = inject(SPAN_ONLY, "Auditor.java");
    assert_eq!(out.matches("import io.opentelemetry.api.trace.Tracer;").count(), 1);
    assert_eq!(out.matches("import io.opentelemetry.api.trace.Span;").count(), 1);
    assert!(out.contains("@Autowired private Tracer tracer;"));
    assert!(out.contains("Span span = tracer.spanBuilder(\"Auditor.record\").startSpan();"));
    assert!(!out.contains("// [pulsegraph] Auto-Import"));
    assert_eq!(inject(&out, "Auditor.java"), out);
}

#[test]
fn tracer_class_collision_switches_to_qualified_names() {
    let out = inject(TRACER_CLASS, "Tracer.java");
    assert!(out.starts_with("// [pulsegraph] Auto-Import\n"));
    assert!(out.contains("@Autowired private io.opentelemetry.api.trace.Tracer tracer;"));
}

#[test]
fn configured_call_sites_replace_defaults() {
    let call_sites = CallSiteSets {
        storage: HashSet::from(["persist".to_string()]),
        remote: HashSet::new(),
    };
    let parser = TreeSitterParser::with_heuristics(ExtractionHeuristics::default(), call_sites);
    let out = parser.inject(
        "class Store {\n    void put() {\n        em.persist(x);\n        repo.save(x);\n    }\n}\n",
        "Store.java",
        &InjectionOptions::default(),
    );
    assert!(out.contains("\"persist\""));
    assert!(!out.contains("\"save\""));
}

#[test]
fn sidecar_project_mirrors_tree_and_keeps_failures_verbatim() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("orders")).unwrap();
    fs::create_dir_all(src.path().join("target")).unwrap();
    fs::write(src.path().join("orders/OrderController.java"), ORDER_CONTROLLER).unwrap();
    fs::write(src.path().join("orders/Broken.java"), "class Broken { void f( { }").unwrap();
    fs::write(src.path().join("target/Gen.java"), "class Gen { void g() { h(); } }").unwrap();

    let options = InjectionOptions {
        mode: InjectionMode::Sidecar,
        ..Default::default()
    };
    let results = TreeSitterParser::new()
        .instrument_project(src.path(), &["target".to_string()], &options, Some(out.path()))
        .unwrap();

    assert_eq!(results.len(), 2);
    let broken = &results[0];
    assert_eq!(broken.destination, out.path().join("orders/Broken.java"));
    assert!(!broken.changed);
    assert_eq!(broken.content, "class Broken { void f( { }");

    let controller = &results[1];
    assert_eq!(controller.destination, out.path().join("orders/OrderController.java"));
    assert!(controller.changed);
    assert!(controller.content.contains("tracer.spanBuilder"));

    // Nothing is written by the parser itself.
    assert!(!out.path().join("orders").exists());
}
