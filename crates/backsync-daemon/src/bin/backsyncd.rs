use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use backsync_cli::config::load_config;
use backsync_core::expand_tilde;
use backsync_daemon::bootstrap::DEFAULT_PID_FILE;
use backsync_daemon::{Daemon, PidFile};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(run(&args));
}

fn run(args: &[String]) -> i32 {
    let Some(command) = args.first() else {
        eprintln!("usage: backsyncd {{start|stop|status|restart}}");
        return 1;
    };

    match command.as_str() {
        "start" => start(),
        "stop" => stop(),
        "status" => status(),
        "restart" => {
            stop();
            start()
        }
        other => {
            eprintln!("unknown command: {other:?}");
            1
        }
    }
}

fn pid_file() -> PidFile {
    PidFile::new(expand_tilde(DEFAULT_PID_FILE))
}

fn start() -> i32 {
    let pidfile = pid_file();
    if pidfile.is_running() {
        eprintln!(
            "daemon already running (pid {})",
            pidfile.read().unwrap_or_default()
        );
        return 1;
    }

    let cfg = match load_config(None) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    let daemon = match Daemon::new(cfg) {
        Ok(daemon) => daemon,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };

    if let Err(err) = pidfile.write() {
        eprintln!("error: {err}");
        return 1;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            pidfile.remove();
            eprintln!("error: start runtime: {err}");
            return 1;
        }
    };

    let result = runtime.block_on(daemon.run());
    pidfile.remove();

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn stop() -> i32 {
    let pidfile = pid_file();
    let Some(pid) = pidfile.read() else {
        eprintln!("daemon is not running");
        return 1;
    };
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => {
            println!("sent SIGTERM to pid {pid}");
            0
        }
        Err(err) => {
            eprintln!("error: signal pid {pid}: {err}");
            pidfile.remove();
            1
        }
    }
}

fn status() -> i32 {
    let pidfile = pid_file();
    if pidfile.is_running() {
        println!("daemon is running (pid {})", pidfile.read().unwrap_or_default());
        0
    } else {
        println!("daemon is not running");
        1
    }
}
