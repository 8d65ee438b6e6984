/// Grouped Employees Example
///
/// This example demonstrates:
/// - Grouping a live list by company, then by gender
/// - Explicit groups that stay visible while empty
/// - An ItemsPresenter keeping headers and containers in step with the view

use livegroup::{
    CollectionView, ContainerFactory, GroupDescription, GroupHeader, GroupStyle, GroupStyles, ItemRef,
    ItemsPresenter, ObservableList, Panel, PanelChild, Record, SortDescription, SortDirection, Value,
    ViewChange, ViewOptions, VirtualizationMode,
};
use std::rc::Rc;

#[derive(Debug)]
struct Employee {
    first_name: &'static str,
    second_name: &'static str,
    company: &'static str,
    gender: &'static str,
}

impl Record for Employee {
    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "FirstName" => Some(self.first_name.into()),
            "SecondName" => Some(self.second_name.into()),
            "Company" => Some(self.company.into()),
            "Gender" => Some(self.gender.into()),
            _ => None,
        }
    }
}

fn employee(first_name: &'static str, second_name: &'static str, company: &'static str, gender: &'static str) -> ItemRef {
    ItemRef::new(Employee {
        first_name,
        second_name,
        company,
        gender,
    })
}

/// Renders containers as indented text lines.
#[derive(Debug, Default)]
struct TextFactory;

impl ContainerFactory for TextFactory {
    type Container = String;

    fn create_container(&mut self, item: &ItemRef, _index: usize) -> String {
        let first = item.property("FirstName").unwrap_or(Value::Null);
        let second = item.property("SecondName").unwrap_or(Value::Null);
        format!("{} {}", first, second)
    }

    fn create_header(&mut self, header: &GroupHeader) -> String {
        format!("== {} ==", header.text)
    }
}

fn print_panel(panel: &Panel<String>, depth: usize) {
    for child in panel.children() {
        match child {
            PanelChild::Container(text) => println!("   {}{}", "  ".repeat(depth), text),
            PanelChild::Group(group) => {
                println!("   {}{}", "  ".repeat(depth), group.header);
                print_panel(&group.panel, depth + 1);
            }
        }
    }
}

fn main() -> livegroup::Result<()> {
    env_logger::init();
    println!("=== LiveGroup Grouped Employees Example ===\n");

    // 1. Source list
    println!("1. Creating employee list...");
    let source = Rc::new(ObservableList::from_items(vec![
        employee("Ann", "Lee", "Acme", "Female"),
        employee("Bob", "Ray", "Globex", "Male"),
        employee("Cid", "Moe", "Acme", "Male"),
        employee("Dee", "Fox", "Initech", "Female"),
    ]));
    println!("   Added {} employees\n", source.len());

    // 2. View grouped by company and gender
    println!("2. Grouping by Company, then Gender...");
    let view = CollectionView::bind(&source, ViewOptions::default())?;
    {
        let mut view = view.borrow_mut();
        view.add_group_description(
            GroupDescription::by_property("Company")?.with_group_keys(vec!["Empty Company".into()]),
        )?;
        view.add_group_description(GroupDescription::by_property("Gender")?.with_group_keys(vec!["Male".into()]))?;
        view.add_sort_description(SortDescription::from_property("SecondName", SortDirection::Descending)?)?;
    }
    view.borrow().subscribe(|_view: &CollectionView, change: &ViewChange| {
        let kind = match change {
            ViewChange::Add { .. } => "add",
            ViewChange::Remove { .. } => "remove",
            ViewChange::Replace { .. } => "replace",
            ViewChange::Move { .. } => "move",
            ViewChange::Reset => "reset",
        };
        match change.index() {
            Some(index) => println!("   view change: {} at {}", kind, index),
            None => println!("   view change: {}", kind),
        }
    });
    println!("   Groups: {:?}\n", view.borrow().tree().snapshot().group_keys());

    // 3. Presenter
    println!("3. Attaching a presenter...");
    let styles = GroupStyles::new(vec![
        GroupStyle::with_header_template(|key: &Value, count: usize| format!("{} ({} employees)", key, count)),
        GroupStyle::default(),
    ]);
    let presenter = ItemsPresenter::new(&view, TextFactory, styles, VirtualizationMode::None);
    presenter.attach_panel()?;
    if let Some(panel) = presenter.virtualizer().panel() {
        print_panel(panel, 0);
    }
    println!();

    // 4. Live changes
    println!("4. Hiring Eve at Globex, Bob leaves...");
    source.push(employee("Eve", "Kim", "Globex", "Female"));
    let bob = source.get(1);
    if let Some(bob) = bob {
        source.remove(&bob);
    }
    if let Some(panel) = presenter.virtualizer().panel() {
        print_panel(panel, 0);
    }
    println!();

    // 5. Tree dump
    println!("5. Group tree as JSON:");
    match view.borrow().tree().snapshot().to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => println!("   could not serialize: {}", e),
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
