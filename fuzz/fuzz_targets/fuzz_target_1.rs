#![no_main]

use libfuzzer_sys::fuzz_target;
use untex::chars::{CharStream, SourceId};
use untex::environment::Environment;
use untex::eyes::Eyes;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let stream = CharStream::new(SourceId(0), "<fuzz>", s);
        let mut env = Environment::new();
        let mut eyes = Eyes::new(stream);
        while let Ok(Some(_)) = eyes.next_token(&mut env) {}
    }
});
