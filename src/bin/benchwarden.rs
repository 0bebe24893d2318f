use benchwarden::app::command_handlers;
use benchwarden::app::command_support::{handle_interrupt_signal, signal_log_path};
use benchwarden::shared::Interrupt;

fn run() -> Result<(), command_handlers::CommandFailure> {
    let interrupt = Interrupt::new();
    let signal = interrupt.clone();
    let runtime_log = signal_log_path();
    if let Err(err) = ctrlc::set_handler(move || {
        if handle_interrupt_signal(&signal, runtime_log.as_deref()) {
            std::process::exit(130);
        }
    }) {
        eprintln!("warning: failed to install signal handler: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = command_handlers::run_cli(args, &interrupt)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(err.exit_code());
    }
}
