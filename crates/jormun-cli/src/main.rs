use std::{env, fs, path::Path, process::ExitCode, time::Instant};

use jormun::{Interpreter, JsValue};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: jormun <file.js|file.mjs>");
        return ExitCode::FAILURE;
    };
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::new();
    // relative specifiers resolve against the importing module's directory;
    // the entry module's specifier is already a usable path
    interp.set_module_resolver(move |specifier, importer| {
        let Some(importer) = importer else {
            return Ok(specifier.to_owned());
        };
        let dir = Path::new(importer).parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(dir.join(specifier).to_string_lossy().into_owned())
    });
    interp.set_module_loader(|id| fs::read_to_string(id).map_err(|e| e.to_string()));

    let start = Instant::now();
    let is_module = file_path.ends_with(".mjs");
    let result = if is_module {
        interp.preload_module(file_path).map(|()| JsValue::Undefined)
    } else {
        interp.eval_async(&source)
    };
    match result {
        Ok(value) => {
            let elapsed = start.elapsed();
            pump_timers(&mut interp);
            if !matches!(value, JsValue::Undefined) {
                println!("{value:?}");
            }
            eprintln!("finished in {elapsed:?}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Uncaught {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs scheduled timers against the real clock until none remain.
fn pump_timers(interp: &mut Interpreter) {
    while interp.has_pending_timers() {
        let now = clock::now_ms();
        match interp.run_timers(now) {
            Ok(ran) => {
                if ran == 0 {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
            }
            Err(err) => {
                eprintln!("Uncaught (in timer) {err}");
                return;
            }
        }
    }
}

mod clock {
    pub fn now_ms() -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}
