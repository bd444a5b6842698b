//! Benchmarks for sorting and batching command lists.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use strata_core::config::BatchCapacities;
use strata_core::math::Vec2;
use strata_render::{
    BatchStorageBuffer, Color, FrameCommands, FrameRenderer, PartitionKey, Sprite,
    SpriteInstance,
};
use strata_test_utils::{GpuBindGroupLayout, GpuTextureView, MockPresenter, MockRenderContext, Presenter};

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_partition");

    for count in [1_000u32, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mock = Arc::new(MockRenderContext::new());
            let mut batches: BatchStorageBuffer<SpriteInstance, PartitionKey> =
                BatchStorageBuffer::new(mock.clone(), GpuBindGroupLayout::mock(0), 4096, "bench");
            b.iter(|| {
                mock.clear_calls();
                let records = (0..count).map(|i| {
                    (
                        PartitionKey::new(0, i / 1000),
                        SpriteInstance::default(),
                    )
                });
                batches.extend_partitioned(records).unwrap();
                black_box(batches.batches().len())
            });
        });
    }

    group.finish();
}

fn bench_frame_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_render");

    for textures in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(10_000));

        group.bench_with_input(
            BenchmarkId::new("sprites_10k", textures),
            &textures,
            |b, &textures| {
                let mock = Arc::new(MockRenderContext::new());
                let mut presenter = MockPresenter::new();
                let mut renderer = FrameRenderer::new(
                    mock.clone(),
                    presenter.color_format(),
                    BatchCapacities::default(),
                )
                .unwrap();
                let handles: Vec<_> = (0..textures)
                    .map(|i| renderer.register_texture(GpuTextureView::mock(i)).unwrap())
                    .collect();

                let mut frame = FrameCommands::default();
                for i in 0..10_000usize {
                    if i % 100 == 0 {
                        frame.advance_depth_layer();
                    }
                    let sprite = Sprite::new(Vec2::splat(i as f32), Vec2::ONE)
                        .with_color(Color::WHITE);
                    frame.append_sprite(handles[i % textures], sprite);
                }

                b.iter(|| {
                    presenter.frames.clear();
                    mock.clear_calls();
                    black_box(renderer.render(&frame, &mut presenter).unwrap())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_partition, bench_frame_render);
criterion_main!(benches);
