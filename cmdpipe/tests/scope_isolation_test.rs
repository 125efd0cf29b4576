//! Per-invocation scope isolation, ambient resolution and scope release
//! under concurrent load.

#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cmdpipe::ambient;
use cmdpipe::errors::ResolutionError;
use cmdpipe::prelude::*;
use cmdpipe_memory::{ServiceCollection, ServiceContainer};

const CONCURRENT_INVOCATIONS: usize = 128;

/// Scoped per-invocation state.
struct RequestState {
    id: usize,
    touches: AtomicUsize,
}

fn container(options: ExecutorOptions) -> Arc<ServiceContainer> {
    let next_id = Arc::new(AtomicUsize::new(0));
    ServiceCollection::new()
        .add_scoped(move |_| {
            Ok(Arc::new(RequestState {
                id: next_id.fetch_add(1, Ordering::SeqCst),
                touches: AtomicUsize::new(0),
            }))
        })
        .add_command_executor(options)
        .build()
}

/// Resolves the scoped state twice across suspension points, once through the
/// context and once through the ambient bridge.
struct TouchState {
    pause: Duration,
}

#[async_trait]
impl Command for TouchState {
    type Output = usize;

    async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<usize> {
        let first = ctx.services().resolve::<RequestState>()?;
        first.touches.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.pause).await;
        tokio::task::yield_now().await;

        let second = ambient::resolve::<RequestState>()?;
        second.touches.fetch_add(1, Ordering::SeqCst);

        if !Arc::ptr_eq(&first, &second) {
            return Err(CommandError::Internal(format!(
                "scope changed mid-invocation: {} vs {}",
                first.id, second.id
            )));
        }
        if second.touches.load(Ordering::SeqCst) != 2 {
            return Err(CommandError::Internal(format!(
                "state {} touched by another invocation",
                second.id
            )));
        }
        Ok(second.id)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_get_isolated_scopes() {
    let container = container(ExecutorOptions::new());

    let tasks: Vec<_> = (0..CONCURRENT_INVOCATIONS)
        .map(|i| {
            let container = Arc::clone(&container);
            tokio::spawn(async move {
                let command = TouchState {
                    pause: Duration::from_millis((i % 7) as u64),
                };
                container.invoke(&command, CancellationToken::new()).await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in futures::future::join_all(tasks).await {
        let id = task.unwrap().unwrap().unwrap();
        ids.insert(id);
    }

    assert_eq!(ids.len(), CONCURRENT_INVOCATIONS);

    let stats = container.stats();
    assert_eq!(stats.scopes_created, CONCURRENT_INVOCATIONS as u64);
    assert_eq!(stats.scopes_disposed, CONCURRENT_INVOCATIONS as u64);
}

/// Middleware that resolves the same scoped state the command will see.
struct StampScope;

#[async_trait]
impl Middleware for StampScope {
    async fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult<()> {
        let state = ambient::resolve::<RequestState>()?;
        ctx.pipeline_data().set("middleware_state", state.id);
        next.run(ctx).await
    }
}

struct CompareWithMiddleware;

#[async_trait]
impl Command for CompareWithMiddleware {
    type Output = bool;

    async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<bool> {
        tokio::task::yield_now().await;
        let seen_by_middleware: usize = ctx.pipeline_data().get_as("middleware_state")?;
        let state = ctx.services().resolve::<RequestState>()?;
        Ok(seen_by_middleware == state.id)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_middleware_and_command_share_the_invocation_scope() {
    let container = container(ExecutorOptions::new().with_middleware_instance(Arc::new(StampScope)));

    let tasks: Vec<_> = (0..CONCURRENT_INVOCATIONS)
        .map(|_| {
            let container = Arc::clone(&container);
            tokio::spawn(async move {
                container
                    .invoke(&CompareWithMiddleware, CancellationToken::new())
                    .await
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        assert_eq!(task.unwrap().unwrap(), Some(true));
    }
}

#[tokio::test]
async fn test_no_ambient_scope_outside_invocation() {
    let container = container(ExecutorOptions::new());

    container
        .invoke(
            &TouchState {
                pause: Duration::ZERO,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!ambient::in_invocation());
    assert!(matches!(
        ambient::resolve::<RequestState>(),
        Err(ResolutionError::NoAmbientScope { .. })
    ));
}

#[tokio::test]
async fn test_nested_invocation_restores_outer_scope() {
    struct Inner;

    #[async_trait]
    impl Command for Inner {
        type Output = usize;

        async fn execute(&self, _ctx: &ExecutionContext) -> CommandResult<usize> {
            Ok(ambient::resolve::<RequestState>()?.id)
        }
    }

    struct Outer;

    #[async_trait]
    impl Command for Outer {
        type Output = (usize, usize, usize);

        async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<(usize, usize, usize)> {
            let before = ambient::resolve::<RequestState>()?.id;
            let inner = ctx
                .services()
                .invoke(&Inner, ctx.cancellation().clone())
                .await?
                .unwrap_or_default();
            let after = ambient::resolve::<RequestState>()?.id;
            Ok((before, inner, after))
        }
    }

    let container = container(ExecutorOptions::new());

    let (before, inner, after) = container
        .invoke(&Outer, CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(before, after);
    assert_ne!(before, inner);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_tasks_need_explicit_propagation() {
    struct SpawnLookups;

    #[async_trait]
    impl Command for SpawnLookups {
        type Output = (bool, bool);

        async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<(bool, bool)> {
            let own = ctx.services().resolve::<RequestState>()?;

            let detached = tokio::spawn(async { ambient::resolve::<RequestState>() })
                .await
                .map_err(|e| CommandError::Internal(e.to_string()))?;
            let propagated = tokio::spawn(ambient::propagate(async {
                ambient::resolve::<RequestState>()
            }))
            .await
            .map_err(|e| CommandError::Internal(e.to_string()))??;

            Ok((
                matches!(detached, Err(ResolutionError::NoAmbientScope { .. })),
                Arc::ptr_eq(&own, &propagated),
            ))
        }
    }

    let container = container(ExecutorOptions::new());

    let outcome = container
        .invoke(&SpawnLookups, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, Some((true, true)));
}

#[tokio::test]
async fn test_scope_released_when_command_fails() {
    struct Fails;

    #[async_trait]
    impl Command for Fails {
        type Output = ();

        async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<()> {
            ctx.services().resolve::<RequestState>()?;
            Err(CommandError::ValidationFailed("amount must be positive".to_string()))
        }
    }

    let container = container(ExecutorOptions::new());

    for _ in 0..3 {
        let err = container
            .invoke(&Fails, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ValidationFailed(_)));
    }

    let stats = container.stats();
    assert_eq!(stats.scopes_created, 3);
    assert_eq!(stats.live_scopes(), 0);
}

#[tokio::test]
async fn test_scope_escaping_invocation_is_disposed() {
    struct Leak;

    #[async_trait]
    impl Command for Leak {
        type Output = Arc<dyn cmdpipe::ServiceScope>;

        async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<Arc<dyn cmdpipe::ServiceScope>> {
            Ok(Arc::clone(ctx.services()))
        }
    }

    let container = container(ExecutorOptions::new());

    let scope = container
        .invoke(&Leak, CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert!(scope.is_disposed());
    assert!(matches!(
        scope.resolve::<RequestState>(),
        Err(ResolutionError::ScopeDisposed { .. })
    ));
}
