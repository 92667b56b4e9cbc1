use crate::models::CardSnapshot;

pub fn render_card(snapshot: &CardSnapshot) -> String {
    CARD_HTML.replace("{{TITLE}}", &escape(&snapshot.title))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

const CARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg: #eef2f7;
      --ink: #26303b;
      --muted: #7b8694;
      --accent: #2d7a4b;
      --accent-2: #355d7d;
      --danger: #c63b2b;
      --card: #ffffff;
      --line: rgba(53, 93, 125, 0.14);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(160deg, var(--bg), #dfe8f2);
      color: var(--ink);
      font-family: "Avenir Next", "Segoe UI", sans-serif;
      display: grid;
      place-items: start center;
      padding: 40px 16px;
    }

    .card {
      width: min(640px, 100%);
      background: var(--card);
      border-radius: 18px;
      border: 1px solid var(--line);
      box-shadow: 0 18px 48px rgba(38, 48, 59, 0.12);
      padding: 28px;
      display: grid;
      gap: 20px;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
      font-weight: 650;
    }

    .goal {
      display: grid;
      grid-template-columns: 1fr auto;
      gap: 4px 12px;
      padding: 12px 0;
      border-bottom: 1px solid var(--line);
    }

    .goal .name {
      font-weight: 600;
    }

    .goal .count {
      font-variant-numeric: tabular-nums;
      color: var(--accent-2);
      font-weight: 600;
      justify-self: end;
    }

    .goal .forecast {
      grid-column: 1 / -1;
      color: var(--muted);
      font-size: 0.88rem;
    }

    .goal .buttons {
      grid-column: 1 / -1;
      display: flex;
      gap: 8px;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 6px 16px;
      font-size: 0.9rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    button:disabled {
      opacity: 0.5;
      cursor: default;
    }

    button:active {
      transform: scale(0.97);
    }

    .checks {
      display: grid;
      gap: 8px;
    }

    .check {
      display: flex;
      align-items: center;
      gap: 10px;
      font-size: 0.95rem;
    }

    .check input {
      width: 18px;
      height: 18px;
      accent-color: var(--accent);
    }

    .check.done span {
      color: var(--muted);
      text-decoration: line-through;
    }

    .error {
      color: var(--danger);
      font-size: 0.9rem;
      min-height: 1.2em;
    }

    .hint {
      margin: 0;
      color: var(--muted);
      font-size: 0.85rem;
    }
  </style>
</head>
<body>
  <main class="card">
    <h1 id="title">{{TITLE}}</h1>
    <section id="goals"></section>
    <section class="checks" id="checklist"></section>
    <div class="error" id="error"></div>
    <p class="hint">Counts save about a second after the last click. Forecasts assume the configured daily pace.</p>
  </main>

  <script>
    const titleEl = document.getElementById('title');
    const goalsEl = document.getElementById('goals');
    const checklistEl = document.getElementById('checklist');
    const errorEl = document.getElementById('error');

    const makeButton = (label, onClick) => {
      const button = document.createElement('button');
      button.type = 'button';
      button.textContent = label;
      button.addEventListener('click', onClick);
      return button;
    };

    const span = (className, text) => {
      const node = document.createElement('span');
      node.className = className;
      node.textContent = text;
      return node;
    };

    const render = (data) => {
      titleEl.textContent = data.title;
      document.title = data.title;
      errorEl.textContent = data.error || '';

      goalsEl.innerHTML = '';
      data.goals.forEach((goal) => {
        const row = document.createElement('div');
        row.className = 'goal';
        row.append(
          span('name', goal.name),
          span('count', `${goal.current} / ${goal.target}`)
        );
        const forecast = goal.days_left === null
          ? `${goal.remaining} to go`
          : `${goal.remaining} to go, ~${goal.days_left} days (${goal.projected_date})`;
        row.append(span('forecast', forecast));
        const buttons = document.createElement('div');
        buttons.className = 'buttons';
        buttons.append(
          makeButton('+1', () => bump(goal.id, 1)),
          makeButton('+5', () => bump(goal.id, 5))
        );
        row.append(buttons);
        goalsEl.append(row);
      });

      checklistEl.innerHTML = '';
      data.checklist.forEach((item) => {
        const row = document.createElement('label');
        row.className = item.checked ? 'check done' : 'check';
        const box = document.createElement('input');
        box.type = 'checkbox';
        box.checked = item.checked;
        box.disabled = data.busy || data.loading;
        box.addEventListener('change', () => toggle(item.id, box.checked));
        row.append(box, span('', item.label));
        checklistEl.append(row);
      });
    };

    const post = async (url, body) => {
      const res = await fetch(url, {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify(body)
      });
      if (!res.ok) {
        throw new Error(await res.text() || 'Request failed');
      }
      render(await res.json());
    };

    const bump = (id, amount) => {
      post(`/api/goal/${id}/increment`, { amount }).catch((err) => {
        errorEl.textContent = err.message;
      });
    };

    const toggle = (id, checked) => {
      post(`/api/check/${id}`, { checked }).catch((err) => {
        errorEl.textContent = err.message;
      });
    };

    const load = async () => {
      const res = await fetch('/api/card');
      if (!res.ok) {
        throw new Error('Unable to load card');
      }
      render(await res.json());
    };

    setInterval(() => {
      load().catch(() => {});
    }, 5000);

    load().catch((err) => {
      errorEl.textContent = err.message;
    });
  </script>
</body>
</html>
"#;
