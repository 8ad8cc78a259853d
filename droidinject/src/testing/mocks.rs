use std::collections::BTreeSet;
use std::io;

use mockall::mock;

use crate::command::CmdOutput;
use crate::ir::MethodSig;
use crate::layout::LayoutResult;

mock! {
    pub HandlerSource {}

    impl crate::layout::HandlerSource for HandlerSource {
        fn handlers(&self) -> LayoutResult<BTreeSet<MethodSig>>;
    }
}

mock! {
    pub CommandRunner {}

    impl crate::command::CommandRunner for CommandRunner {
        fn run(&self, cmd: &str, args: &[String]) -> io::Result<CmdOutput>;
    }
}

/// Output of a process that exited with `code`
#[cfg(unix)]
pub fn cmd_output(code: i32, stderr: &str) -> CmdOutput {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    CmdOutput {
        status: ExitStatus::from_raw(code << 8),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}
