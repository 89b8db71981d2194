//! Dispatch benchmarks for the dynamic router.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pipeflow::cancellation::CancellationToken;
use pipeflow::context::{PipeContext, RootContext};
use pipeflow::payload::PayloadCache;
use pipeflow::pipe::{self, Pipe};
use pipeflow::router::{ConverterRegistry, DynamicRouter};
use std::sync::Arc;

#[derive(Clone)]
struct Envelope {
    inner: Arc<RootContext>,
    kind: u8,
}

impl PipeContext for Envelope {
    fn cancellation(&self) -> &CancellationToken {
        self.inner.cancellation()
    }

    fn payloads(&self) -> &PayloadCache {
        self.inner.payloads()
    }
}

#[derive(Clone)]
struct KindA {
    envelope: Envelope,
}

impl PipeContext for KindA {
    fn cancellation(&self) -> &CancellationToken {
        self.envelope.cancellation()
    }

    fn payloads(&self) -> &PayloadCache {
        self.envelope.payloads()
    }
}

#[derive(Clone)]
struct KindB {
    envelope: Envelope,
}

impl PipeContext for KindB {
    fn cancellation(&self) -> &CancellationToken {
        self.envelope.cancellation()
    }

    fn payloads(&self) -> &PayloadCache {
        self.envelope.payloads()
    }
}

fn routed_envelope(kind: u8) -> Envelope {
    Envelope {
        inner: Arc::new(RootContext::new()),
        kind,
    }
}

fn build_router() -> DynamicRouter<Envelope, ConverterRegistry<Envelope>> {
    let registry = ConverterRegistry::new()
        .register_fn(|envelope: &Envelope| {
            (envelope.kind == 0).then(|| KindA {
                envelope: envelope.clone(),
            })
        })
        .register_fn(|envelope: &Envelope| {
            (envelope.kind == 1).then(|| KindB {
                envelope: envelope.clone(),
            })
        });

    let router = DynamicRouter::new(registry);
    let pipe_a: Arc<dyn Pipe<KindA>> = Arc::new(pipe::execute(|_: &KindA| {}));
    let pipe_b: Arc<dyn Pipe<KindB>> = Arc::new(pipe::execute(|_: &KindB| {}));
    router.connect_pipe(pipe_a).unwrap();
    router.connect_pipe(pipe_b).unwrap();
    router
}

fn router_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = build_router();

    c.bench_function("router_send_single_match", |b| {
        b.iter(|| {
            rt.block_on(async {
                router.send(black_box(routed_envelope(0))).await.unwrap();
            });
        });
    });

    c.bench_function("router_send_no_match", |b| {
        b.iter(|| {
            rt.block_on(async {
                router.send(black_box(routed_envelope(7))).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, router_dispatch);
criterion_main!(benches);
