use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use livegroup::*;
use std::collections::HashMap;
use std::rc::Rc;

fn row(id: usize) -> ItemRef {
    let mut row = HashMap::new();
    row.insert("Id".to_string(), Value::Int64(id as i64));
    row.insert("Company".to_string(), Value::from(format!("Company {}", id % 20)));
    row.insert("Gender".to_string(), Value::from(if id % 2 == 0 { "Female" } else { "Male" }));
    ItemRef::new(row)
}

fn rows(size: usize) -> Vec<ItemRef> {
    (0..size).map(row).collect()
}

fn bench_store_middle_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_middle_insert");

    for size in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("vec", size), size, |b, &size| {
            b.iter(|| {
                let mut store = VecStore::new();
                for (i, item) in rows(size).into_iter().enumerate() {
                    store.insert(black_box(i / 2), item).unwrap();
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("block", size), size, |b, &size| {
            b.iter(|| {
                let mut store = BlockStore::new();
                for (i, item) in rows(size).into_iter().enumerate() {
                    store.insert(black_box(i / 2), item).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_grouped_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouped_refresh");

    for size in [1000, 10000].iter() {
        let source = Rc::new(rows(*size));
        let mut view = CollectionView::new(&source).unwrap();
        view.add_group_description(GroupDescription::by_property("Company").unwrap())
            .unwrap();
        view.add_group_description(GroupDescription::by_property("Gender").unwrap())
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| view.refresh().unwrap());
        });
    }
    group.finish();
}

fn bench_sorted_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_refresh");

    for size in [1000, 10000].iter() {
        let source = Rc::new(rows(*size));
        let mut view = CollectionView::new(&source).unwrap();
        view.add_sort_description(SortDescription::from_property("Company", SortDirection::Ascending).unwrap())
            .unwrap();
        view.add_sort_description(SortDescription::from_property("Id", SortDirection::Descending).unwrap())
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| view.refresh().unwrap());
        });
    }
    group.finish();
}

fn bench_incremental_grouped_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_grouped_add");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let source = Rc::new(ObservableList::new());
                let view = CollectionView::bind(&source, ViewOptions::default()).unwrap();
                view.borrow_mut()
                    .add_group_description(GroupDescription::by_property("Company").unwrap())
                    .unwrap();
                for item in rows(size) {
                    source.push(black_box(item));
                }
                view.borrow().len()
            });
        });
    }
    group.finish();
}

fn bench_leaf_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf_lookup");

    for size in [1000, 10000].iter() {
        let source = Rc::new(rows(*size));
        let mut view = CollectionView::new(&source).unwrap();
        view.add_group_description(GroupDescription::by_property("Company").unwrap())
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| view.get(black_box(size / 2)).is_some());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_store_middle_insert,
    bench_grouped_refresh,
    bench_sorted_refresh,
    bench_incremental_grouped_add,
    bench_leaf_lookup,
);

criterion_main!(benches);
