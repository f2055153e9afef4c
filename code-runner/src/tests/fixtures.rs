/// Toolchain tables used by tests
pub mod toolchains {
    /// Runs every program through `sh` so pipeline tests do not depend on
    /// installed interpreters. The `c` entry has a real compile step: a
    /// syntax check followed by a copy to `{binary}`.
    pub const SHELL: &str = r#"
        [python]
        extension = "sh"
        run = ["sh", "{source}"]
        env = { TOOL_CACHE = "{home}/cache" }
        primary = { language = "python3", version_index = "0" }

        [c]
        extension = "sh"
        compile = ["sh", "-c", "sh -n \"$0\" && cp \"$0\" \"$1\"", "{source}", "{binary}"]
        run = ["sh", "{binary}"]
        artifacts = ["{binary}"]
        primary = { language = "c", version_index = "0" }
    "#;

    /// A compiled toolchain whose build product cannot be executed
    pub const UNRUNNABLE_BUILD: &str = r#"
        [c]
        extension = "sh"
        compile = ["sh", "-c", "sh -n \"$0\" && cp \"$0\" \"$1\"", "{source}", "{binary}"]
        run = ["{binary}"]
        artifacts = ["{binary}"]
        primary = { language = "c", version_index = "0" }
    "#;

    /// A toolchain whose interpreter does not exist on any host
    pub const UNAVAILABLE: &str = r#"
        [python]
        extension = "py"
        run = ["code-runner-missing-interpreter", "{source}"]
        primary = { language = "python3", version_index = "0" }
    "#;
}

/// Shell programs for the `sh`-backed toolchain
pub mod shell_programs {
    pub const HELLO: &str = "echo ok";
    pub const ECHO_LINE: &str = "read line\necho \"$line\"";
    pub const WRITES_STDERR: &str = "echo partial\necho boom >&2";
    pub const SILENT_NONZERO_EXIT: &str = "echo ok\nexit 3";
    pub const SELF_KILL: &str = "kill -9 $$";
    pub const TICK_THEN_SLEEP: &str = "echo tick\nsleep 30";
    pub const FLOOD: &str = "yes";
    pub const SYNTAX_ERROR: &str = "echo ran > ran.marker\nif then fi";
    /// Leaves state behind the way toolchain caches do
    pub const WRITES_CACHES: &str = "mkdir -p \"$TOOL_CACHE\" .local/state\necho x > \"$TOOL_CACHE/entry\"\necho x > .local/state/db\necho ok";
    pub const PRINT_HOME: &str = "echo \"$HOME\"\npwd\necho \"$TOOL_CACHE\"";
    /// Leaves a descendant in its own session holding stdout open
    pub const ESCAPES_SESSION: &str = "echo started\nsetsid sh -c 'sleep 2; echo late > \"$0\".escaped' \"$0\" &\nsleep 0.3";
    /// Sleeps for the number of seconds given on stdin, then checks that its
    /// own source file is still present.
    pub const SLEEP_THEN_CHECK_SELF: &str = "read delay\nsleep \"$delay\"\ntest -f \"$0\" && echo alive";
}

/// Test code samples for different languages
pub mod code_samples {
    pub const PYTHON_HELLO: &str = r#"print("ok")"#;
    pub const JS_HELLO: &str = r#"console.log("ok")"#;
    pub const JAVA_HELLO: &str = r#"
public class Main {
    public static void main(String[] args) {
        System.out.println("ok");
    }
}
"#;
    pub const C_HELLO: &str = r#"
#include <stdio.h>
int main(void) {
    printf("ok\n");
    return 0;
}
"#;
    pub const CPP_HELLO: &str = r#"
#include <iostream>
int main() {
    std::cout << "ok" << std::endl;
    return 0;
}
"#;
    pub const GO_HELLO: &str = r#"package main

import "fmt"

func main() {
    fmt.Println("ok")
}"#;
}

/// Test code samples for specific scenarios
pub mod test_scenarios {
    pub const PYTHON_ECHO: &str = "print(input())";
    pub const JS_ECHO: &str = r#"
let data = "";
process.stdin.on("data", chunk => data += chunk);
process.stdin.on("end", () => console.log(data.split("\n")[0]));
"#;
    pub const C_ECHO: &str = r#"
#include <stdio.h>
int main(void) {
    char line[256];
    if (fgets(line, sizeof line, stdin)) printf("%s", line);
    return 0;
}
"#;
    pub const PYTHON_RUNTIME_ERROR: &str = r#"raise ValueError("boom")"#;
    pub const PYTHON_INFINITE_LOOP: &str = "while True:\n    pass";
    pub const C_SYNTAX_ERROR: &str = "int main( { return 0; }";
    pub const GO_SYNTAX_ERROR: &str = "package main\nfunc main() {";
}
