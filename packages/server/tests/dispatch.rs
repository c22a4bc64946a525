use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use collection_literals::btree;

use contour_contract::{
    codes, path, schema_fn, CancellationSignal, ClientLink, ClientOptions, ConfigError, Context,
    ContextExtension, ContractProcedure, ContractRouter, ErrorSpec, RpcError, ValidationError,
    Value,
};
use contour_server::{
    handler_fn, loader_fn, middleware_fn, Implementer, Invocation, LoggingMiddleware, Next,
    ProcedureBuilder, Router, RouterLink, RouterModule,
};

fn snapshot(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_middleware_order_and_context_scope() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let outer_log = log.clone();
    let inner_log = log.clone();
    let handler_log = log.clone();

    let procedure = ProcedureBuilder::new()
        .middleware(middleware_fn(move |next: Next| {
            let log = outer_log.clone();
            async move {
                log.lock()
                    .unwrap()
                    .push(format!("outer sees tenant={}", next.context().contains_key("tenant")));
                let result = next
                    .run(ContextExtension::new().with("user", "alice"))
                    .await;
                log.lock().unwrap().push("outer exit".to_string());
                result
            }
        }))
        .middleware(middleware_fn(move |next: Next| {
            let log = inner_log.clone();
            async move {
                let user = next.context().get("user").and_then(Value::as_str).map(str::to_string);
                log.lock().unwrap().push(format!("inner sees user={:?}", user));
                let result = next.run(ContextExtension::new().with("tenant", "acme")).await;
                log.lock().unwrap().push("inner exit".to_string());
                result
            }
        }))
        .handler(handler_fn(move |inv: Invocation| {
            let log = handler_log.clone();
            async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(Value::Map(inv.context.to_map()))
            }
        }))
        .unwrap();

    let link = RouterLink::new(Router::new().procedure("me", procedure).unwrap());
    let out = link
        .call(
            &path!("me"),
            Value::Null,
            ClientOptions::new().with_context(Context::from_entries([("requestId", "r-1")])),
        )
        .await
        .unwrap();

    assert_eq!(
        out,
        Value::Map(btree! {
            "requestId".to_string() => Value::from("r-1"),
            "tenant".to_string() => Value::from("acme"),
            "user".to_string() => Value::from("alice"),
        })
    );
    assert_eq!(
        snapshot(&log),
        vec![
            "outer sees tenant=false",
            "inner sees user=Some(\"alice\")",
            "handler",
            "inner exit",
            "outer exit",
        ]
    );
}

#[tokio::test]
async fn test_short_circuit_keeps_original_code() {
    let handler_ran = Arc::new(AtomicBool::new(false));
    let flag = handler_ran.clone();

    let procedure = ProcedureBuilder::new()
        .middleware(middleware_fn(|next: Next| async move {
            if next.context().contains_key("token") {
                next.proceed().await
            } else {
                Err(RpcError::new(codes::UNAUTHORIZED).with_message("missing token"))
            }
        }))
        .handler(handler_fn(move |_inv: Invocation| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Value::from("secret"))
            }
        }))
        .unwrap();
    let link = RouterLink::new(Router::new().procedure("secret", procedure).unwrap());

    let err = link
        .call(&path!("secret"), Value::Null, ClientOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::UNAUTHORIZED);
    assert_eq!(err.message(), "missing token");
    assert!(!handler_ran.load(Ordering::SeqCst));

    let out = link
        .call(
            &path!("secret"),
            Value::Null,
            ClientOptions::new().with_context(Context::from_entries([("token", "t")])),
        )
        .await
        .unwrap();
    assert_eq!(out, Value::from("secret"));
}

#[tokio::test]
async fn test_cancel_mid_chain_yields_cancelled() {
    let handler_ran = Arc::new(AtomicBool::new(false));
    let flag = handler_ran.clone();
    let signal = CancellationSignal::new();
    let trigger = signal.clone();

    let procedure = ProcedureBuilder::new()
        .middleware(middleware_fn(move |next: Next| {
            let trigger = trigger.clone();
            async move {
                // Cancelled after the chain started but before the handler.
                trigger.cancel();
                next.proceed().await
            }
        }))
        .middleware(LoggingMiddleware::new())
        .handler(handler_fn(move |_inv: Invocation| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Value::from("partial"))
            }
        }))
        .unwrap();
    let link = RouterLink::new(Router::new().procedure("slow", procedure).unwrap());

    let err = link
        .call(
            &path!("slow"),
            Value::Null,
            ClientOptions::new().with_signal(signal),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::CANCELLED);
    assert_eq!(err.status(), 499);
    assert!(!handler_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_handler_observes_signal() {
    let signal = CancellationSignal::new();
    let procedure = ProcedureBuilder::new()
        .handler(handler_fn(|inv: Invocation| async move {
            let Some(signal) = inv.signal else {
                return Ok(Value::from("no signal"));
            };
            tokio::select! {
                _ = signal.cancelled() => Err(RpcError::cancelled()),
                _ = tokio::time::sleep(Duration::from_secs(30)) => Ok(Value::from("done")),
            }
        }))
        .unwrap();
    let link = RouterLink::new(Router::new().procedure("wait", procedure).unwrap());

    let canceller = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = link
        .call(&path!("wait"), Value::Null, ClientOptions::new().with_signal(signal))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

fn posts_router() -> Result<Router, ConfigError> {
    let get_post = ProcedureBuilder::new().handler(handler_fn(|inv: Invocation| async move {
        Ok(Value::map().with("id", inv.input.get("id").cloned()))
    }))?;
    Router::new().procedure("getPost", get_post)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lazy_router_under_concurrent_calls() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();

    let app = Router::new()
        .lazy(
            "posts",
            loader_fn(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(25)).await;
                    posts_router()
                        .map(RouterModule::from)
                        .map_err(|e| RpcError::internal(e.to_string()))
                }
            }),
        )
        .unwrap();
    let link = Arc::new(RouterLink::new(app));

    let calls = (0..32i64).map(|id| {
        let link = link.clone();
        tokio::spawn(async move {
            link.call(
                &path!("posts/getPost"),
                Value::map().with("id", id),
                ClientOptions::new(),
            )
            .await
        })
    });
    let outputs = futures::future::join_all(calls).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    for (id, output) in outputs.into_iter().enumerate() {
        let output = output.unwrap().unwrap();
        assert_eq!(output.get("id"), Some(&Value::Integer(id as i64)));
    }

    let err = link
        .call(&path!("posts/missing"), Value::Null, ClientOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::NOT_FOUND);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_contract_first_router() {
    let get_post = ContractProcedure::builder()
        .input(schema_fn("post id", |value: Value| {
            match value.get("id").and_then(Value::as_i64) {
                Some(_) => Ok(value),
                None => Err(ValidationError::at(path!("id"), "required")),
            }
        }))
        .error(
            "POST_NOT_FOUND",
            ErrorSpec::new(404).message("Post does not exist"),
        )
        .build()
        .unwrap();
    let contract = ContractRouter::new()
        .router("posts", ContractRouter::new().procedure("getPost", get_post).unwrap())
        .unwrap();

    let router = Implementer::new(contract)
        .middleware(LoggingMiddleware::new())
        .handler(
            &path!("posts/getPost"),
            handler_fn(|inv: Invocation| async move {
                match inv.input.get("id").and_then(Value::as_i64) {
                    Some(1) => Ok(Value::map().with("title", "hello")),
                    _ => Err(RpcError::new("POST_NOT_FOUND")),
                }
            }),
        )
        .unwrap()
        .build()
        .unwrap();
    let link = RouterLink::new(router);

    let found = link
        .call(
            &path!("posts/getPost"),
            Value::map().with("id", 1i64),
            ClientOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(found.get("title").and_then(Value::as_str), Some("hello"));

    let missing = link
        .call(
            &path!("posts/getPost"),
            Value::map().with("id", 2i64),
            ClientOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(missing.is_defined());
    assert_eq!(missing.status(), 404);
    assert_eq!(missing.message(), "Post does not exist");

    let invalid = link
        .call(&path!("posts/getPost"), Value::map(), ClientOptions::new())
        .await
        .unwrap_err();
    assert_eq!(invalid.code(), codes::BAD_REQUEST);
    assert!(!invalid.is_defined());
}
