#![allow(dead_code)]

use ble_cliapp::system::console::Console;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory console shared between the code under test and the assertions.
pub struct Capture {
    pub console: Console,
    output: Rc<RefCell<String>>,
}

impl Capture {
    pub fn new() -> Self {
        let output = Rc::new(RefCell::new(String::new()));
        Self {
            console: Console::shared(output.clone()),
            output,
        }
    }

    /// Everything written so far, without consuming it.
    pub fn text(&self) -> String {
        self.output.borrow().clone()
    }

    /// Drain the output.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    /// Drain the output and parse every complete document in it.
    pub fn documents(&self) -> Vec<Value> {
        let text = self.take();
        assert!(text.is_empty() || text.ends_with("\r\n"), "unterminated output: {text:?}");
        text.split_terminator("\r\n")
            .map(|line| serde_json::from_str(line).unwrap_or_else(|e| panic!("{e}: {line}")))
            .collect()
    }

    /// Drain the output, which must hold exactly one document.
    pub fn document(&self) -> Value {
        let mut documents = self.documents();
        assert_eq!(documents.len(), 1, "expected one document, got {documents:?}");
        documents.remove(0)
    }
}

/// Check the fixed key order `name, arguments, status, result|error`.
pub fn assert_key_order(raw: &str) {
    let positions: Vec<usize> = ["\"name\":", "\"arguments\":", "\"status\":"]
        .iter()
        .map(|key| raw.find(key).unwrap_or_else(|| panic!("{key} missing in {raw}")))
        .collect();
    let payload = raw
        .find("\"result\":")
        .or_else(|| raw.find("\"error\":"))
        .unwrap_or_else(|| panic!("no payload in {raw}"));
    assert!(positions[0] < positions[1] && positions[1] < positions[2] && positions[2] < payload, "{raw}");
}
