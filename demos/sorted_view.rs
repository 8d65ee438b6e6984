/// Sorted View Example
///
/// This example demonstrates:
/// - Loading view options from JSON
/// - Culture-aware string sorting and custom comparators
/// - Incremental adds landing at their sorted position

use livegroup::{
    Culture, CollectionView, ItemRef, ObservableList, SortDescription, SortDirection, ViewChange, ViewOptions,
};
use std::rc::Rc;

fn print_view(label: &str, view: &CollectionView) {
    let names: Vec<String> = view.iter().map(|item| item.self_value().to_string()).collect();
    println!("   {}: {:?}", label, names);
}

fn main() -> livegroup::Result<()> {
    env_logger::init();
    println!("=== LiveGroup Sorted View Example ===\n");

    // 1. Options
    println!("1. Loading options...");
    let options = ViewOptions::from_json(r#"{ "storage": "fast_updates" }"#)?;
    println!("   Storage: {:?}\n", options.storage);

    let source = Rc::new(ObservableList::new());
    source.extend(["banana", "Apple", "cherry", "apple", "Banana"].into_iter().map(|name| ItemRef::value(name)));

    // 2. Invariant culture: case-insensitive first, lowercase before uppercase
    println!("2. Sorting with the invariant culture...");
    let view = CollectionView::bind(&source, options)?;
    view.borrow_mut()
        .add_sort_description(SortDescription::from_property("", SortDirection::Ascending)?)?;
    print_view("invariant", &view.borrow());

    // 3. Ordinal culture
    println!("\n3. Switching to ordinal comparison...");
    view.borrow_mut().clear_sort_descriptions()?;
    view.borrow_mut().add_sort_description(SortDescription::from_property_with_culture(
        "",
        SortDirection::Ascending,
        Culture::Ordinal,
    )?)?;
    print_view("ordinal", &view.borrow());

    // 4. Custom comparator: by length, longest first
    println!("\n4. Sorting by length, longest first...");
    view.borrow_mut().clear_sort_descriptions()?;
    view.borrow_mut().add_sort_description(SortDescription::from_comparer(
        |a: &ItemRef, b: &ItemRef| {
            let a = a.self_value().to_string().len();
            let b = b.self_value().to_string().len();
            a.cmp(&b)
        },
        SortDirection::Descending,
    ))?;
    print_view("by length", &view.borrow());

    // 5. Live adds
    println!("\n5. Adding items to the source...");
    view.borrow().subscribe(|_view: &CollectionView, change: &ViewChange| {
        if let ViewChange::Add { item, index } = change {
            println!("   added {} at {}", item.self_value(), index);
        }
    });
    source.push(ItemRef::value("fig"));
    source.push(ItemRef::value("elderberry"));
    print_view("after adds", &view.borrow());

    println!("\n=== Example Complete ===");
    Ok(())
}
