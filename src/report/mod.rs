pub mod table;
pub mod json;

use chrono::{Local, NaiveDateTime};

use crate::store::SnapshotRecord;

pub fn print_list(records: &[SnapshotRecord], json_output: bool) {
    if json_output {
        println!("{}", json::render(records));
    } else {
        print!("{}", table::render(records, now()));
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
